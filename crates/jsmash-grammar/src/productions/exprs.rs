//! Expression productions.

use crate::bindings::Bindings;
use crate::cat;
use crate::context::GenCtx;
use crate::error::GeneratorResult;
use crate::grammar::Production;

use super::functions::iife;
use super::ids::{destructuring_pattern, PROPERTY_NAMES};
use super::quote;
use super::statements::compiled_source;

const UNARY_OPS: &[&str] = &["-", "+", "!", "~", "typeof ", "void ", "delete ", "await "];

const UPDATE_OPS: &[&str] = &["++", "--"];

const BINARY_OPS: &[&str] = &[
    " + ", " - ", " * ", " / ", " % ", " ** ", " << ", " >> ", " >>> ", " < ", " > ", " <= ",
    " >= ", " == ", " != ", " === ", " !== ", " & ", " | ", " ^ ", " && ", " || ", " ?? ",
    " in ", " instanceof ",
];

const ASSIGN_OPS: &[&str] = &[
    " = ", " += ", " -= ", " *= ", " /= ", " %= ", " **= ", " <<= ", " >>= ", " >>>= ", " &= ",
    " |= ", " ^= ", " &&= ", " ||= ", " ??= ",
];

const COMPILERS: &[&str] = &["eval", "Function", "new Function", "(0, eval)"];

pub(crate) static EXPRS: &[Production] = &[
    Production::terminal("term", 10, term),
    Production::terminal("binding", 3, binding),
    Production::recursive("unary", 3, unary),
    Production::recursive("update", 1, update),
    Production::recursive("binary", 6, binary),
    Production::recursive("assign", 4, assign),
    Production::recursive("conditional", 2, conditional),
    Production::recursive("comma", 1, comma),
    Production::recursive("call", 4, call),
    Production::recursive("new", 2, construct),
    Production::recursive("member", 3, member),
    Production::recursive("index", 2, index),
    Production::recursive("optional_chain", 1, optional_chain),
    Production::recursive("array", 2, array),
    Production::recursive("object", 2, object),
    Production::recursive("spread_call", 1, spread_call),
    Production::recursive("template", 1, template),
    Production::recursive("tagged_template", 1, tagged_template),
    Production::recursive("function", 3, function),
    Production::recursive("iife", 1, immediate_call),
    Production::recursive("destructuring_assign", 1, destructuring_assign),
    Production::recursive("compile", 2, compile),
    Production::recursive("regex", 2, regex),
    Production::recursive("parenthesized", 2, parenthesized),
];

fn term(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.term(d, b)
}

fn binding(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    match ctx.reuse_binding(b) {
        Some(name) => Ok(name),
        None => ctx.id(d, b),
    }
}

fn unary(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.pick(UNARY_OPS)?, ctx.expr(d - 1, b)?)
}

fn update(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let op = ctx.pick(UPDATE_OPS)?;
    if ctx.chance(2) {
        cat!(ctx, op, ctx.lvalue(d - 1, b)?)
    } else {
        cat!(ctx, ctx.lvalue(d - 1, b)?, op)
    }
}

fn binary(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, ctx.pick(BINARY_OPS)?, ctx.expr(d - 1, b)?)
}

fn assign(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.lvalue(d - 1, b)?, ctx.pick(ASSIGN_OPS)?, ctx.expr(d - 1, b)?)
}

fn conditional(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        ctx.expr(d - 1, b)?,
        " ? ",
        ctx.expr(d - 1, b)?,
        " : ",
        ctx.expr(d - 1, b)?
    )
}

fn comma(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "(", ctx.expr(d - 1, b)?, ", ", ctx.expr(d - 1, b)?, ")")
}

fn arguments(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let count = ctx.below(4);
    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        args.push(ctx.expr(d, b)?);
    }
    Ok(args.join(", "))
}

fn call(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, "(", arguments(ctx, d - 1, b)?, ")")
}

fn construct(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "new ", ctx.expr(d - 1, b)?, "(", arguments(ctx, d - 1, b)?, ")")
}

fn member(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, ".", ctx.pick(PROPERTY_NAMES)?)
}

fn index(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, "[", ctx.expr(d - 1, b)?, "]")
}

fn optional_chain(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, "?.", ctx.pick(PROPERTY_NAMES)?)
}

/// An array literal with holes and spread elements.
pub(crate) fn array_literal(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let count = ctx.below(5);
    let mut elements = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let element = match ctx.below(6) {
            0 => String::new(),
            1 => format!("...{}", ctx.expr(d - 1, b)?),
            _ => ctx.expr(d - 1, b)?,
        };
        elements.push(element);
    }
    cat!(ctx, "[", elements.join(", "), "]")
}

/// An object literal with plain, computed, accessor and spread members.
pub(crate) fn object_literal(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let count = ctx.below(4);
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let member = match ctx.below(6) {
            0 => format!("[{}]: {}", ctx.expr(d - 1, b)?, ctx.expr(d - 1, b)?),
            1 => format!("...{}", ctx.expr(d - 1, b)?),
            2 => format!(
                "get {}() {{ return {}; }}",
                ctx.pick(PROPERTY_NAMES)?,
                ctx.expr(d - 1, b)?
            ),
            _ => format!("{}: {}", ctx.pick(PROPERTY_NAMES)?, ctx.expr(d - 1, b)?),
        };
        members.push(member);
    }
    cat!(ctx, "({", members.join(", "), "})")
}

fn array(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    array_literal(ctx, d, b)
}

fn object(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    object_literal(ctx, d, b)
}

fn spread_call(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, "(...", ctx.expr(d - 1, b)?, ")")
}

/// A template literal with a few substitutions.
pub(crate) fn template_literal(
    ctx: &mut GenCtx<'_>,
    d: i32,
    b: &Bindings,
) -> GeneratorResult<String> {
    let count = ctx.below(3);
    let mut text = String::from("`");
    for _ in 0..count {
        text.push_str(ctx.pick(&["", "a", "\\n", "\\u{10FFFF}", "$", "\\`"])?);
        text.push_str("${");
        text.push_str(&ctx.expr(d - 1, b)?);
        text.push('}');
    }
    text.push('`');
    Ok(text)
}

fn template(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    template_literal(ctx, d, b)
}

fn tagged_template(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, template_literal(ctx, d, b)?)
}

fn function(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.function(d, b)
}

fn immediate_call(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    iife(ctx, d, b)
}

fn destructuring_assign(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let (pattern, _) = destructuring_pattern(ctx, d - 1, b)?;
    cat!(ctx, "(", pattern, " = ", ctx.expr(d - 1, b)?, ")")
}

/// Feed a nested statement to the dynamic compilation primitive.
fn compile(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let compiler = ctx.pick(COMPILERS)?;
    let source = compiled_source(ctx, d - 1, b)?;
    cat!(ctx, compiler, "(", quote(&source), ")")
}

fn regex(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.regex(d, b)
}

fn parenthesized(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "(", ctx.expr(d - 1, b)?, ")")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Engine;
    use crate::options::GrammarOptions;
    use jsmash_core::Mt19937;

    #[test]
    fn test_compile_quotes_source() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        for seed in 0..50 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let text = compile(&mut ctx, 3, &Bindings::new()).unwrap();
            assert!(text.ends_with("\")"), "{text}");
            assert!(!text.contains('\n'), "{text}");
        }
    }

    #[test]
    fn test_template_is_closed() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        for seed in 0..50 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let text = template_literal(&mut ctx, 2, &Bindings::new()).unwrap();
            assert!(text.starts_with('`') && text.ends_with('`'));
        }
    }
}
