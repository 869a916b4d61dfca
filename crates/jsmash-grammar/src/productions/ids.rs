//! Identifiers, assignment targets and destructuring patterns.

use crate::bindings::Bindings;
use crate::cat;
use crate::context::GenCtx;
use crate::error::GeneratorResult;
use crate::grammar::Production;

/// Plain names minted for new bindings.
const NAMES: &[&str] = &[
    "a", "b", "c", "d", "e", "f", "g", "h", "x", "y", "z", "w", "v", "u", "t", "s",
];

/// Names with special meaning somewhere in the language.
const SPECIAL_NAMES: &[&str] = &[
    "eval",
    "arguments",
    "undefined",
    "NaN",
    "Infinity",
    "constructor",
    "prototype",
    "__proto__",
    "length",
    "let",
    "yield",
    "async",
    "await",
    "of",
    "get",
    "set",
    "static",
];

/// Property names worth poking at.
pub(crate) const PROPERTY_NAMES: &[&str] = &[
    "x",
    "length",
    "prototype",
    "constructor",
    "__proto__",
    "valueOf",
    "toString",
    "caller",
    "callee",
    "name",
    "then",
    "lastIndex",
    "source",
    "0",
    "1e81",
];

pub(crate) static IDS: &[Production] = &[
    Production::terminal("bound_or_fresh", 8, bound_or_fresh),
    Production::terminal("fresh", 3, fresh),
    Production::terminal("special", 2, special),
    Production::terminal("escaped", 1, escaped),
];

pub(crate) static LVALUES: &[Production] = &[
    Production::terminal("name", 8, name),
    Production::terminal("arguments_slot", 1, arguments_slot),
    Production::recursive("member", 3, member),
    Production::recursive("index", 2, index),
    Production::recursive("destructuring", 2, destructuring),
    Production::recursive("parenthesized", 1, parenthesized),
];

/// A plain name from the pool. One draw.
pub(crate) fn fresh_name(ctx: &mut GenCtx<'_>) -> GeneratorResult<String> {
    Ok(ctx.pick(NAMES)?.to_string())
}

fn bound_or_fresh(ctx: &mut GenCtx<'_>, _d: i32, b: &Bindings) -> GeneratorResult<String> {
    match ctx.reuse_binding(b) {
        Some(name) => Ok(name),
        None => fresh_name(ctx),
    }
}

fn fresh(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    fresh_name(ctx)
}

fn special(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    Ok(ctx.pick(SPECIAL_NAMES)?.to_string())
}

fn escaped(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    let name = fresh_name(ctx)?;
    let mut out = String::new();
    for c in name.chars() {
        if ctx.chance(2) {
            out.push_str(&format!("\\u{:04x}", c as u32));
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn name(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.id(d, b)
}

fn arguments_slot(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    Ok(format!("arguments[{}]", ctx.below(4)))
}

fn member(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, ".", ctx.pick(PROPERTY_NAMES)?)
}

fn index(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, "[", ctx.expr(d - 1, b)?, "]")
}

fn destructuring(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    Ok(destructuring_pattern(ctx, d, b)?.0)
}

fn parenthesized(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "(", ctx.lvalue(d - 1, b)?, ")")
}

/// A binding pattern and the names it introduces.
///
/// Default values see the bindings of the enclosing scope only.
pub(crate) fn destructuring_pattern(
    ctx: &mut GenCtx<'_>,
    d: i32,
    b: &Bindings,
) -> GeneratorResult<(String, Vec<String>)> {
    if d <= 0 || ctx.chance(3) {
        let name = fresh_name(ctx)?;
        return Ok((name.clone(), vec![name]));
    }

    let mut names = Vec::new();
    let mut elements = Vec::new();
    let count = ctx.below(4);

    if ctx.chance(2) {
        for i in 0..count {
            match ctx.below(6) {
                0 => elements.push(String::new()),
                1 if i + 1 == count => {
                    let rest = fresh_name(ctx)?;
                    elements.push(format!("...{rest}"));
                    names.push(rest);
                }
                2 => {
                    let target = fresh_name(ctx)?;
                    let default = ctx.expr(d - 1, b)?;
                    elements.push(format!("{target} = {default}"));
                    names.push(target);
                }
                _ => {
                    let (pattern, inner) = destructuring_pattern(ctx, d - 1, b)?;
                    elements.push(pattern);
                    names.extend(inner);
                }
            }
        }
        Ok((format!("[{}]", elements.join(", ")), names))
    } else {
        for _ in 0..count {
            match ctx.below(4) {
                0 => {
                    let shorthand = fresh_name(ctx)?;
                    elements.push(shorthand.clone());
                    names.push(shorthand);
                }
                1 => {
                    let key = ctx.expr(d - 1, b)?;
                    let (pattern, inner) = destructuring_pattern(ctx, d - 1, b)?;
                    elements.push(format!("[{key}]: {pattern}"));
                    names.extend(inner);
                }
                _ => {
                    let key = ctx.pick(PROPERTY_NAMES)?;
                    let (pattern, inner) = destructuring_pattern(ctx, d - 1, b)?;
                    elements.push(format!("{key}: {pattern}"));
                    names.extend(inner);
                }
            }
        }
        Ok((format!("{{{}}}", elements.join(", ")), names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Engine;
    use crate::options::GrammarOptions;
    use jsmash_core::Mt19937;

    #[test]
    fn test_pattern_names_appear_in_pattern() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        for seed in 0..200 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let (pattern, names) = destructuring_pattern(&mut ctx, 4, &Bindings::new()).unwrap();
            for name in &names {
                assert!(pattern.contains(name.as_str()), "{name} missing from {pattern}");
            }
        }
    }

    #[test]
    fn test_pattern_at_depth_zero_is_a_name() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        let mut rng = Mt19937::new(9);
        let mut ctx = engine.context(&mut rng);
        let (pattern, names) = destructuring_pattern(&mut ctx, 0, &Bindings::new()).unwrap();
        assert_eq!(names, vec![pattern]);
    }
}
