//! Regular expression builder.
//!
//! Patterns are built together with candidate strings they are expected to
//! match. Samples are best effort: lookaheads and anchors make some of them
//! inexact, which is fine for a fuzzer.

use jsmash_core::Mt19937;

/// Most sample strings kept per sub-pattern.
const MAX_SAMPLES: usize = 4;

/// A generated pattern with candidate matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexResult {
    pub pattern: String,
    pub sample_matches: Vec<String>,
}

impl RegexResult {
    fn single(pattern: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            sample_matches: vec![sample.into()],
        }
    }

    /// Render as a literal, never producing `//`.
    pub fn literal(&self, flags: &str) -> String {
        if self.pattern.is_empty() {
            format!("/(?:)/{flags}")
        } else {
            format!("/{}/{flags}", self.pattern)
        }
    }

    /// Pick one sample match, or the empty string. One draw.
    pub fn pick_sample(&self, rng: &mut Mt19937) -> String {
        let draw = rng.next_u32() as usize;
        if self.sample_matches.is_empty() {
            String::new()
        } else {
            self.sample_matches[draw % self.sample_matches.len()].clone()
        }
    }
}

/// Captured-group samples visible to backreferences.
///
/// Group `n` (1-based) captured `captures[n - 1]`. A group is pushed when it
/// is opened, so a backreference can only name a group that already exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegexCtx {
    pub captures: Vec<String>,
}

impl RegexCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_count(&self) -> usize {
        self.captures.len()
    }
}

const LITERALS: &[&str] = &["a", "b", "x", "0", " ", "-", "\u{e9}"];

const ESCAPES: &[(&str, &str)] = &[
    ("\\d", "7"),
    ("\\D", "q"),
    ("\\w", "w"),
    ("\\W", "%"),
    ("\\s", " "),
    ("\\S", "s"),
    (".", "z"),
    ("\\b", ""),
    ("\\B", ""),
];

const SPECIAL_ESCAPES: &[(&str, &str)] = &[
    ("\\u0041", "A"),
    ("\\x42", "B"),
    ("\\n", "\n"),
    ("\\t", "\t"),
    ("(?:\\0)", "\0"),
    ("\\cJ", "\n"),
    ("\\/", "/"),
];

const CLASSES: &[(&str, &str)] = &[
    ("[abc]", "b"),
    ("[^abc]", "d"),
    ("[a-z]", "m"),
    ("[\\d\\s]", "3"),
    ("[^]", "\n"),
    ("[]", ""),
    ("[\\w-]", "-"),
];

/// `(suffix, min repetitions, max repetitions)`
const QUANTIFIERS: &[(&str, u32, u32)] = &[
    ("*", 0, 2),
    ("+", 1, 2),
    ("?", 0, 1),
    ("{2}", 2, 2),
    ("{1,}", 1, 3),
    ("{0,3}", 0, 3),
];

/// Flag combinations for literals.
pub(crate) const FLAGS: &[&str] = &["", "g", "i", "m", "y", "u", "s", "gi", "gm", "gimy", "d"];

/// Build a pattern of bounded depth, threading captures through `ctx`.
pub fn regex_pattern(rng: &mut Mt19937, depth: i32, ctx: RegexCtx) -> (RegexResult, RegexCtx) {
    if depth <= 0 || rng.chance(3) {
        return regex_term(rng, ctx);
    }

    match rng.below(8) {
        0 | 1 => {
            let (left, ctx) = regex_pattern(rng, depth - 1, ctx);
            let (right, ctx) = regex_pattern(rng, depth - 1, ctx);
            let mut samples = Vec::new();
            for l in &left.sample_matches {
                for r in &right.sample_matches {
                    if samples.len() < MAX_SAMPLES {
                        samples.push(format!("{l}{r}"));
                    }
                }
            }
            let result = RegexResult {
                pattern: format!("{}{}", left.pattern, right.pattern),
                sample_matches: samples,
            };
            (result, ctx)
        }
        2 => {
            let (left, ctx) = regex_pattern(rng, depth - 1, ctx);
            let (right, ctx) = regex_pattern(rng, depth - 1, ctx);
            let samples = left
                .sample_matches
                .into_iter()
                .chain(right.sample_matches)
                .take(MAX_SAMPLES)
                .collect();
            let result = RegexResult {
                pattern: format!("{}|{}", left.pattern, right.pattern),
                sample_matches: samples,
            };
            (result, ctx)
        }
        3 | 4 => quantified(rng, depth, ctx),
        5 => {
            let mut ctx = ctx;
            let slot = ctx.captures.len();
            ctx.captures.push(String::new());
            let (inner, mut ctx) = regex_pattern(rng, depth - 1, ctx);
            if let Some(first) = inner.sample_matches.first() {
                ctx.captures[slot] = first.clone();
            }
            let result = RegexResult {
                pattern: format!("({})", inner.pattern),
                sample_matches: inner.sample_matches,
            };
            (result, ctx)
        }
        6 => {
            let (inner, ctx) = regex_pattern(rng, depth - 1, ctx);
            let result = RegexResult {
                pattern: format!("(?:{})", inner.pattern),
                sample_matches: inner.sample_matches,
            };
            (result, ctx)
        }
        _ => {
            let negative = rng.chance(2);
            let (guard, ctx) = regex_pattern(rng, depth - 1, ctx);
            let (body, ctx) = regex_pattern(rng, depth - 1, ctx);
            let open = if negative { "(?!" } else { "(?=" };
            let result = RegexResult {
                pattern: format!("{open}{}){}", guard.pattern, body.pattern),
                sample_matches: body.sample_matches,
            };
            (result, ctx)
        }
    }
}

fn quantified(rng: &mut Mt19937, depth: i32, ctx: RegexCtx) -> (RegexResult, RegexCtx) {
    let (atom, ctx) = regex_pattern(rng, depth - 1, ctx);
    let (suffix, min, max) = QUANTIFIERS[rng.below(QUANTIFIERS.len() as u32) as usize];
    let lazy = if rng.chance(4) { "?" } else { "" };
    let repeats = min + rng.below(max - min + 1);

    let pattern = if atom.pattern.chars().count() == 1 {
        format!("{}{suffix}{lazy}", atom.pattern)
    } else {
        format!("(?:{}){suffix}{lazy}", atom.pattern)
    };
    let samples = atom
        .sample_matches
        .iter()
        .map(|s| s.repeat(repeats as usize))
        .collect();

    (
        RegexResult {
            pattern,
            sample_matches: samples,
        },
        ctx,
    )
}

fn regex_term(rng: &mut Mt19937, ctx: RegexCtx) -> (RegexResult, RegexCtx) {
    let result = match rng.below(6) {
        0 => {
            let literal = LITERALS[rng.below(LITERALS.len() as u32) as usize];
            RegexResult::single(literal, literal)
        }
        1 => {
            let (pattern, sample) = ESCAPES[rng.below(ESCAPES.len() as u32) as usize];
            RegexResult::single(pattern, sample)
        }
        2 => {
            let (pattern, sample) = CLASSES[rng.below(CLASSES.len() as u32) as usize];
            RegexResult::single(pattern, sample)
        }
        3 if ctx.group_count() > 0 => {
            // Wrapped so a following digit cannot extend the group number.
            let group = rng.below(ctx.group_count() as u32) as usize;
            RegexResult::single(format!("(?:\\{})", group + 1), ctx.captures[group].clone())
        }
        4 => {
            if rng.chance(2) {
                RegexResult::single("^", "")
            } else {
                RegexResult::single("$", "")
            }
        }
        5 => {
            let (pattern, sample) =
                SPECIAL_ESCAPES[rng.below(SPECIAL_ESCAPES.len() as u32) as usize];
            RegexResult::single(pattern, sample)
        }
        _ => RegexResult::single("a", "a"),
    };
    (result, ctx)
}
