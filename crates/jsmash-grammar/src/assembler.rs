//! The token assembler.

use tracing::trace;

use crate::bindings::Bindings;
use crate::context::GenCtx;
use crate::error::{GeneratorResult, GrammarError};
use crate::fragment::Fragment;

/// Line-break-like tokens that exercise statement termination edge cases.
const NOISE: &[&str] = &["\r", "\n", "//h\n", "/*\n*/", "\u{2028}", "\u{2029}"];

const TORTURE_SLOTS: u32 = 120;
const TORTURE_DROP_ODDS: u32 = 12;
const SPLICE_DEPTH: i32 = 2;

impl GenCtx<'_> {
    /// Join fragments into one string.
    ///
    /// Noise tokens may appear before the first fragment and between
    /// fragments, never after the last one.
    /// In torture mode fragments may be dropped and the accumulated prefix
    /// corrupted. Any non-text fragment fails before a single draw is made.
    pub fn cat(&mut self, parts: Vec<Fragment>) -> GeneratorResult<String> {
        let mut texts = Vec::with_capacity(parts.len());
        for (index, part) in parts.into_iter().enumerate() {
            match part {
                Fragment::Text(text) => texts.push(text),
                Fragment::List(_) => return Err(GrammarError::NonTextFragment { index }),
            }
        }

        let torture_probability = self.options().torture_probability;
        let torture = self.bool_with(torture_probability);
        if torture {
            trace!(fragments = texts.len(), "torture");
        }

        let mut out = String::from(self.noise()?);
        let last = texts.len().saturating_sub(1);
        for (index, text) in texts.iter().enumerate() {
            let dropped = torture && self.chance(TORTURE_DROP_ODDS);
            if !dropped {
                out.push_str(text);
            }
            if index < last {
                out.push_str(self.noise()?);
            }

            if !torture {
                continue;
            }
            match self.below(TORTURE_SLOTS) {
                0..=4 if self.can_escape() => {
                    out.push_str(self.maybe_space());
                    let splice = self.escape_hatch(SPLICE_DEPTH, &Bindings::from_names(["x"]))?;
                    out.push_str(&splice);
                    out.push_str(self.maybe_space());
                }
                5 => out = format!("({out})"),
                6 => out.clear(),
                7 => return Ok(out),
                8 => out.push_str("/*"),
                9 => out.push('\''),
                10 => {
                    if self.chance(2) {
                        out.push('(');
                    }
                    out.push('/');
                }
                _ => {}
            }
        }

        Ok(out)
    }

    /// A noise token or nothing. One draw, two when noise is emitted.
    fn noise(&mut self) -> GeneratorResult<&'static str> {
        let noise_probability = self.options().noise_probability;
        if self.bool_with(noise_probability) {
            self.pick(NOISE)
        } else {
            Ok("")
        }
    }

    fn maybe_space(&mut self) -> &'static str {
        if self.chance(2) {
            " "
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::cat;
    use crate::fragment::Fragment;
    use crate::grammar::Engine;
    use crate::options::GrammarOptions;
    use crate::error::GrammarError;
    use jsmash_core::Mt19937;

    #[test]
    fn test_plain_concatenation() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        let mut rng = Mt19937::new(42);
        let mut ctx = engine.context(&mut rng);
        assert_eq!(cat!(ctx, "a", "b", "c").unwrap(), "abc");
    }

    #[test]
    fn test_non_text_fragment_fails_fast() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        let mut rng = Mt19937::new(42);
        let before = rng.export_state();
        let mut ctx = engine.context(&mut rng);
        let err = ctx
            .cat(vec![
                Fragment::from("a"),
                Fragment::List(vec![Fragment::from("1")]),
            ])
            .unwrap_err();
        assert_eq!(err, GrammarError::NonTextFragment { index: 1 });
        assert_eq!(rng.export_state(), before);
    }

    #[test]
    fn test_noise_keeps_fragments_in_order() {
        let options = GrammarOptions {
            noise_probability: 1.0,
            ..GrammarOptions::quiet()
        };
        let engine = Engine::new(options).unwrap();
        let mut rng = Mt19937::new(3);
        let mut ctx = engine.context(&mut rng);
        let out = cat!(ctx, "alpha", "beta").unwrap();

        let a = out.find("alpha").unwrap();
        let b = out.find("beta").unwrap();
        assert!(a < b);
        assert!(out.len() > "alphabeta".len());
    }

    #[test]
    fn test_no_noise_after_last_fragment() {
        let options = GrammarOptions {
            noise_probability: 1.0,
            ..GrammarOptions::quiet()
        };
        let engine = Engine::new(options).unwrap();
        for seed in 0..20 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let out = cat!(ctx, "alpha", "beta").unwrap();
            assert!(out.ends_with("beta"), "seed {seed}: {out:?}");
            assert!(!out.starts_with("alpha"), "seed {seed}: {out:?}");

            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let single = cat!(ctx, "x").unwrap();
            assert!(single.ends_with('x') && single.len() > 1, "seed {seed}: {single:?}");
        }
    }

    #[test]
    fn test_torture_is_deterministic() {
        let options = GrammarOptions {
            torture_probability: 1.0,
            max_calls: 200,
            ..GrammarOptions::quiet()
        };
        let engine = Engine::new(options).unwrap();

        for seed in 0..50 {
            let mut a = Mt19937::new(seed);
            let mut b = Mt19937::new(seed);
            let first = cat!(engine.context(&mut a), "x", " = ", "1", ";").unwrap();
            let second = cat!(engine.context(&mut b), "x", " = ", "1", ";").unwrap();
            assert_eq!(first, second);
        }
    }
}
