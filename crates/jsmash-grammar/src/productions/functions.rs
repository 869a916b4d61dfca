//! Function expressions, declarations and their pieces.

use crate::bindings::Bindings;
use crate::cat;
use crate::context::GenCtx;
use crate::error::GeneratorResult;
use crate::grammar::Production;

use super::ids::{destructuring_pattern, fresh_name};
use super::quote;

const EMPTY_FUNCTIONS: &[&str] = &[
    "function(){}",
    "function(){ return this; }",
    "function(){ return arguments; }",
    "(function(){})",
    "() => {}",
    "(...a) => a",
    "function*(){}",
    "async function(){}",
    "Function",
    "eval",
    "Math.sin",
    "Array.prototype.push",
];

pub(crate) static FUNCTIONS: &[Production] = &[
    Production::terminal("empty", 2, empty),
    Production::recursive("function_expr", 6, function_expr),
    Production::recursive("generator_expr", 3, generator_expr),
    Production::recursive("arrow_expr", 4, arrow_expr),
    Production::recursive("arrow_block", 2, arrow_block),
    Production::recursive("async_function", 1, async_function),
    Production::recursive("method", 2, method),
    Production::recursive("accessors", 1, accessors),
    Production::recursive("function_constructor", 1, function_constructor),
    Production::recursive("bound", 1, bound),
];

fn empty(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    Ok(ctx.pick(EMPTY_FUNCTIONS)?.to_string())
}

/// A parameter list and the names it binds.
///
/// Usually zero to two parameters; occasionally up to 99, each with a
/// smaller depth than the one before.
pub(crate) fn formal_args(
    ctx: &mut GenCtx<'_>,
    d: i32,
    b: &Bindings,
) -> GeneratorResult<(String, Vec<String>)> {
    let count = if ctx.chance(5) {
        ctx.below(100)
    } else {
        ctx.below(3)
    };

    let mut params = Vec::with_capacity(count as usize);
    let mut names = Vec::new();
    for i in 0..count {
        let arg_depth = d - i as i32;
        let last = i + 1 == count;
        match ctx.below(8) {
            0 if arg_depth > 0 => {
                let (pattern, inner) = destructuring_pattern(ctx, arg_depth, b)?;
                params.push(pattern);
                names.extend(inner);
            }
            1 if arg_depth > 0 => {
                let name = fresh_name(ctx)?;
                let default = ctx.expr(arg_depth - 1, b)?;
                params.push(format!("{name} = {default}"));
                names.push(name);
            }
            2 if last => {
                let name = fresh_name(ctx)?;
                params.push(format!("...{name}"));
                names.push(name);
            }
            _ => {
                let name = fresh_name(ctx)?;
                params.push(name.clone());
                names.push(name);
            }
        }
    }

    Ok((params.join(", "), names))
}

/// A function body in one of five shapes.
pub(crate) fn function_body(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    match ctx.below(5) {
        0 => ctx.statement(d, b),
        1 => cat!(ctx, "return ", ctx.expr(d, b)?, ";"),
        2 => cat!(ctx, "\"use strict\"; ", ctx.statement(d, b)?),
        3 => cat!(ctx, ctx.statement(d, b)?, " return ", ctx.expr(d, b)?, ";"),
        _ => cat!(ctx, "yield ", ctx.expr(d, b)?, ";"),
    }
}

fn generator_body(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let delegate = if ctx.chance(4) { "yield* " } else { "yield " };
    cat!(
        ctx,
        delegate,
        ctx.expr(d, b)?,
        "; ",
        function_body(ctx, d, b)?
    )
}

/// An optional function name; the name is visible inside the body.
fn maybe_name(ctx: &mut GenCtx<'_>) -> GeneratorResult<Option<String>> {
    if ctx.chance(2) {
        Ok(Some(fresh_name(ctx)?))
    } else {
        Ok(None)
    }
}

fn scope(b: &Bindings, name: Option<&String>, params: Vec<String>) -> Bindings {
    match name {
        Some(name) => b.with(name.as_str()).with_all(params),
        None => b.with_all(params),
    }
}

fn function_expr(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let name = maybe_name(ctx)?;
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = scope(b, name.as_ref(), names);
    cat!(
        ctx,
        "(function ",
        name.unwrap_or_default(),
        "(",
        params,
        ") { ",
        function_body(ctx, d - 1, &inner)?,
        " })"
    )
}

fn generator_expr(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let name = maybe_name(ctx)?;
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = scope(b, name.as_ref(), names);
    cat!(
        ctx,
        "(function* ",
        name.unwrap_or_default(),
        "(",
        params,
        ") { ",
        generator_body(ctx, d - 1, &inner)?,
        " })"
    )
}

fn arrow_expr(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = b.with_all(names);
    cat!(ctx, "((", params, ") => ", ctx.expr(d - 1, &inner)?, ")")
}

fn arrow_block(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = b.with_all(names);
    cat!(
        ctx,
        "((",
        params,
        ") => { ",
        function_body(ctx, d - 1, &inner)?,
        " })"
    )
}

fn async_function(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = b.with_all(names);
    cat!(
        ctx,
        "(async function(",
        params,
        ") { await ",
        ctx.expr(d - 1, &inner)?,
        "; ",
        function_body(ctx, d - 1, &inner)?,
        " })"
    )
}

fn method(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let name = fresh_name(ctx)?;
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = b.with_all(names);
    cat!(
        ctx,
        "({ ",
        &name,
        "(",
        params,
        ") { ",
        function_body(ctx, d - 1, &inner)?,
        " } }).",
        &name
    )
}

fn accessors(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let name = fresh_name(ctx)?;
    let param = fresh_name(ctx)?;
    let setter_scope = b.with(param.as_str());
    cat!(
        ctx,
        "Object.getOwnPropertyDescriptor({ get ",
        &name,
        "() { ",
        function_body(ctx, d - 1, b)?,
        " }, set ",
        &name,
        "(",
        &param,
        ") { ",
        ctx.statement(d - 1, &setter_scope)?,
        " } }, ",
        quote(&name),
        ").",
        ctx.pick(&["get", "set"])?
    )
}

fn function_constructor(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let (params, names) = formal_args(ctx, 0, b)?;
    let inner = b.with_all(names);
    let body = function_body(ctx, d - 1, &inner)?;
    let callee = ctx.pick(&["new Function", "Function"])?;
    cat!(ctx, "(", callee, "(", quote(&params), ", ", quote(&body), "))")
}

fn bound(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        ctx.function(d - 1, b)?,
        ".bind(",
        ctx.expr(d - 1, b)?,
        ")"
    )
}

/// An immediately invoked function expression.
pub(crate) fn iife(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = b.with_all(names);
    let body = function_body(ctx, d - 1, &inner)?;

    let arg_count = ctx.below(3);
    let mut args = Vec::new();
    for _ in 0..arg_count {
        args.push(ctx.expr(d - 1, b)?);
    }

    cat!(
        ctx,
        "(function(",
        params,
        ") { ",
        body,
        " })(",
        args.join(", "),
        ")"
    )
}

/// A function declaration, used at statement level.
pub(crate) fn declaration(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let generator = ctx.chance(4);
    let name = fresh_name(ctx)?;
    let (params, names) = formal_args(ctx, d - 1, b)?;
    let inner = b.with(name.as_str()).with_all(names);
    let body = if generator {
        generator_body(ctx, d - 1, &inner)?
    } else {
        function_body(ctx, d - 1, &inner)?
    };
    cat!(
        ctx,
        if generator { "function* " } else { "function " },
        name,
        "(",
        params,
        ") { ",
        body,
        " }"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Engine;
    use crate::options::GrammarOptions;
    use jsmash_core::Mt19937;

    #[test]
    fn test_formal_args_bind_every_name() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        let mut saw_long_list = false;
        for seed in 0..300 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let (params, names) = formal_args(&mut ctx, 3, &Bindings::new()).unwrap();
            for name in &names {
                assert!(params.contains(name.as_str()));
            }
            saw_long_list |= names.len() > 3;
        }
        assert!(saw_long_list);
    }

    #[test]
    fn test_declaration_shape() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        for seed in 0..50 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let text = declaration(&mut ctx, 4, &Bindings::new()).unwrap();
            assert!(text.starts_with("function"), "{text}");
            assert!(text.ends_with('}'), "{text}");
        }
    }
}
