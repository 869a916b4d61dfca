//! Literal terms and regular-expression usage.

use crate::bindings::Bindings;
use crate::cat;
use crate::context::GenCtx;
use crate::error::GeneratorResult;
use crate::grammar::Production;
use crate::regex::{regex_pattern, RegexCtx, RegexResult, FLAGS};

use super::quote;

const NUMBERS: &[&str] = &[
    "0",
    "-0",
    "1",
    "-1",
    "0.1",
    "1.5",
    "42",
    "0x7fffffff",
    "0x80000000",
    "-0x80000000",
    "0xffffffff",
    "0x100000000",
    "4294967296",
    "9007199254740992",
    "9007199254740993",
    "1e81",
    "1e-81",
    "5e-324",
    "1.7976931348623157e308",
    "NaN",
    "Infinity",
    "-Infinity",
    "(-1/0)",
    "(0/0)",
    "0o17",
    "0b101",
    "1n",
    "-(2**53)",
];

const STRINGS: &[&str] = &[
    "\"\"",
    "''",
    "\"a\"",
    "\"0\"",
    "\"-0\"",
    "\"\\0\"",
    "\"\\u0000\"",
    "\"\\uD800\"",
    "\"\\uDFFF\"",
    "\"\\n\"",
    "\"use strict\"",
    "\"__proto__\"",
    "\"length\"",
    "\"constructor\"",
    "'\\u2028'",
    "`x`",
];

const VALUES: &[&str] = &[
    "null",
    "undefined",
    "true",
    "false",
    "this",
    "arguments",
    "[]",
    "[,]",
    "[undefined]",
    "{}",
    "({})",
    "(void 0)",
    "new Object",
    "new Array()",
    "new Number(1)",
    "new String('')",
    "new Boolean(false)",
    "Symbol()",
    "Symbol.iterator",
    "Object.create(null)",
    "new Proxy({}, {})",
    "new ArrayBuffer(8)",
    "new Int32Array(4)",
    "new Float64Array([1.5])",
    "new Map",
    "new Set",
    "new WeakMap",
    "Math",
    "JSON",
    "Date.prototype",
    "Function.prototype",
    "Array.prototype",
    "(function(){})",
    "(() => {})",
];

const REGEX_METHODS: &[&str] = &["exec", "test"];
const STRING_METHODS: &[&str] = &["match", "search", "split", "matchAll"];

pub(crate) static TERMS: &[Production] = &[
    Production::terminal("number", 4, number),
    Production::terminal("string", 3, string),
    Production::terminal("value", 5, value),
    Production::terminal("id", 5, id),
    Production::terminal("regex_literal", 1, regex_literal),
];

pub(crate) static REGEXES: &[Production] = &[
    Production::terminal("literal", 3, regex_literal),
    Production::terminal("constructor", 1, regex_constructor),
    Production::terminal("method", 4, regex_method),
    Production::terminal("string_method", 3, string_method),
    Production::recursive("replace", 2, regex_replace),
    Production::recursive("last_index", 1, regex_last_index),
];

/// A number literal, sometimes drawn outside the fixed pool.
pub(crate) fn number_literal(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    if ctx.chance(4) {
        Ok(ctx.below(256).to_string())
    } else {
        Ok(ctx.pick(NUMBERS)?.to_string())
    }
}

pub(crate) fn string_literal(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    Ok(ctx.pick(STRINGS)?.to_string())
}

fn number(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    number_literal(ctx, d, b)
}

fn string(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    string_literal(ctx, d, b)
}

fn value(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    Ok(ctx.pick(VALUES)?.to_string())
}

fn id(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.id(d, b)
}

/// A pattern of its own small depth; independent of the caller's budget.
fn pattern(ctx: &mut GenCtx<'_>) -> RegexResult {
    let depth = 1 + ctx.below(4) as i32;
    regex_pattern(ctx.rng(), depth, RegexCtx::new()).0
}

fn flags(ctx: &mut GenCtx<'_>) -> GeneratorResult<&'static str> {
    ctx.pick(FLAGS)
}

fn regex_literal(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    let result = pattern(ctx);
    let flags = flags(ctx)?;
    Ok(result.literal(flags))
}

fn regex_constructor(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    let result = pattern(ctx);
    let flags = flags(ctx)?;
    cat!(ctx, "new RegExp(", quote(&result.pattern), ", ", quote(flags), ")")
}

fn regex_method(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    let result = pattern(ctx);
    let flags = flags(ctx)?;
    let method = ctx.pick(REGEX_METHODS)?;
    let sample = result.pick_sample(ctx.rng());
    cat!(ctx, result.literal(flags), ".", method, "(", quote(&sample), ")")
}

fn string_method(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    let result = pattern(ctx);
    let flags = flags(ctx)?;
    let method = ctx.pick(STRING_METHODS)?;
    let sample = result.pick_sample(ctx.rng());
    cat!(ctx, quote(&sample), ".", method, "(", result.literal(flags), ")")
}

fn regex_replace(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let result = pattern(ctx);
    let flags = flags(ctx)?;
    let sample = result.pick_sample(ctx.rng());
    cat!(
        ctx,
        quote(&sample),
        ".replace(",
        result.literal(flags),
        ", ",
        ctx.expr(d - 1, b)?,
        ")"
    )
}

fn regex_last_index(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let result = pattern(ctx);
    let sample = result.pick_sample(ctx.rng());
    cat!(
        ctx,
        "(function() { var r = ",
        result.literal("g"),
        "; r.lastIndex = ",
        ctx.expr(d - 1, b)?,
        "; return r.exec(",
        quote(&sample),
        "); })()"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Engine;
    use crate::options::GrammarOptions;
    use jsmash_core::Mt19937;

    #[test]
    fn test_regex_literal_shape() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        for seed in 0..100 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let literal = regex_literal(&mut ctx, 0, &Bindings::new()).unwrap();
            assert!(literal.starts_with('/'));
            assert!(!literal.starts_with("//"), "{literal}");
        }
    }

    #[test]
    fn test_numbers_are_text() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        let mut rng = Mt19937::new(4);
        let mut ctx = engine.context(&mut rng);
        for _ in 0..50 {
            let n = number_literal(&mut ctx, 0, &Bindings::new()).unwrap();
            assert!(!n.is_empty());
        }
    }
}
