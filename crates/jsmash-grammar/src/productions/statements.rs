//! Statement productions.

use crate::bindings::Bindings;
use crate::cat;
use crate::context::GenCtx;
use crate::error::GeneratorResult;
use crate::grammar::Production;

use super::functions::declaration;
use super::ids::{destructuring_pattern, fresh_name};

const LITTLE_STATEMENTS: &[&str] = &[
    ";",
    "{}",
    "debugger;",
    "break;",
    "continue;",
    "return;",
    "\"use strict\";",
    "this.x = 1;",
    "throw undefined;",
    "yield;",
];

const DECLARATION_KEYWORDS: &[&str] = &["var ", "let ", "const "];

const LABELS: &[&str] = &["L", "M", "outer", "inner"];

pub(crate) static STATEMENTS: &[Production] = &[
    Production::terminal("little", 3, little),
    Production::terminal("throw_term", 1, throw_term),
    Production::terminal("term_statement", 2, term_statement),
    Production::recursive("block", 3, block),
    Production::recursive("declaration", 5, variable_declaration),
    Production::recursive("destructuring_declaration", 2, destructuring_declaration),
    Production::recursive("let_block", 2, let_block),
    Production::recursive("if", 3, if_statement),
    Production::recursive("if_else", 2, if_else),
    Production::recursive("counted_for", 3, counted_for),
    Production::recursive("for_in_of", 3, for_in_of),
    Production::recursive("while", 1, while_loop),
    Production::recursive("do_while", 1, do_while),
    Production::recursive("labeled", 1, labeled),
    Production::recursive("switch", 2, switch),
    Production::recursive("try_catch", 3, try_catch),
    Production::recursive("try_finally", 1, try_finally),
    Production::recursive("throw", 1, throw),
    Production::recursive("return", 1, return_statement),
    Production::recursive("with", 1, with),
    Production::recursive("function_declaration", 3, function_declaration),
    Production::recursive("expression", 8, expression),
    Production::recursive("eval_statement", 1, eval_statement),
];

fn little(ctx: &mut GenCtx<'_>, _d: i32, _b: &Bindings) -> GeneratorResult<String> {
    Ok(ctx.pick(LITTLE_STATEMENTS)?.to_string())
}

fn throw_term(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "throw ", ctx.term(d, b)?, ";")
}

fn term_statement(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.term(d, b)?, ";")
}

/// Zero to three statements.
pub(crate) fn statement_list(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let count = ctx.below(4);
    let mut out = String::new();
    for i in 0..count {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&ctx.statement(d, b)?);
    }
    Ok(out)
}

/// A statement rendered for the dynamic compilation primitive.
pub(crate) fn compiled_source(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.statement(d, b)
}

/// The braces-and-cases body of a switch statement.
pub(crate) fn switch_body(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let cases = ctx.below(4);
    let mut out = String::from("{ ");
    for _ in 0..cases {
        out.push_str(&cat!(
            ctx,
            "case ",
            ctx.expr(d, b)?,
            ": ",
            statement_list(ctx, d, b)?,
            " "
        )?);
        if ctx.chance(2) {
            out.push_str("break; ");
        }
    }
    if ctx.chance(2) {
        out.push_str(&cat!(ctx, "default: ", statement_list(ctx, d, b)?, " ")?);
    }
    out.push('}');
    Ok(out)
}

fn block(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "{ ", statement_list(ctx, d - 1, b)?, " }")
}

fn variable_declaration(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let keyword = ctx.pick(DECLARATION_KEYWORDS)?;
    let name = fresh_name(ctx)?;
    // The initializer sees its own name: TDZ and hoisting cases.
    let inner = b.with(name.as_str());
    cat!(ctx, keyword, name, " = ", ctx.expr(d - 1, &inner)?, ";")
}

fn destructuring_declaration(
    ctx: &mut GenCtx<'_>,
    d: i32,
    b: &Bindings,
) -> GeneratorResult<String> {
    let keyword = ctx.pick(DECLARATION_KEYWORDS)?;
    let (pattern, _) = destructuring_pattern(ctx, d - 1, b)?;
    cat!(ctx, keyword, pattern, " = ", ctx.expr(d - 1, b)?, ";")
}

fn let_block(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let keyword = ctx.pick(&["let ", "const "])?;
    let (pattern, names) = destructuring_pattern(ctx, d - 1, b)?;
    let init = ctx.expr(d - 1, b)?;
    let inner = b.with_all(names);
    cat!(
        ctx,
        "{ ",
        keyword,
        pattern,
        " = ",
        init,
        "; ",
        statement_list(ctx, d - 1, &inner)?,
        " }"
    )
}

fn if_statement(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "if (", ctx.expr(d - 1, b)?, ") ", ctx.statement(d - 1, b)?)
}

fn if_else(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        "if (",
        ctx.expr(d - 1, b)?,
        ") { ",
        ctx.statement(d - 1, b)?,
        " } else { ",
        ctx.statement(d - 1, b)?,
        " }"
    )
}

fn counted_for(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let keyword = ctx.pick(&["var ", "let "])?;
    let counter = fresh_name(ctx)?;
    let limit = ctx.below(5).to_string();
    let inner = b.with(counter.as_str());
    cat!(
        ctx,
        "for (",
        keyword,
        &counter,
        " = 0; ",
        &counter,
        " < ",
        limit,
        "; ++",
        &counter,
        ") ",
        ctx.statement(d - 1, &inner)?
    )
}

fn for_in_of(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let keyword = ctx.pick(&["var ", "let ", "const ", ""])?;
    let (head, names) = if keyword.is_empty() {
        (ctx.lvalue(d - 1, b)?, Vec::new())
    } else {
        destructuring_pattern(ctx, d - 1, b)?
    };
    let relation = ctx.pick(&[" in ", " of "])?;
    let subject = ctx.expr(d - 1, b)?;
    let inner = b.with_all(names);
    cat!(
        ctx,
        "for (",
        keyword,
        head,
        relation,
        subject,
        ") ",
        ctx.statement(d - 1, &inner)?
    )
}

fn while_loop(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        "while ((",
        ctx.expr(d - 1, b)?,
        ") && 0) ",
        ctx.statement(d - 1, b)?
    )
}

fn do_while(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        "do { ",
        ctx.statement(d - 1, b)?,
        " } while ((",
        ctx.expr(d - 1, b)?,
        ") && 0);"
    )
}

fn labeled(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let label = ctx.pick(LABELS)?;
    cat!(ctx, label, ": ", ctx.statement(d - 1, b)?)
}

fn switch(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        "switch (",
        ctx.expr(d - 1, b)?,
        ") ",
        switch_body(ctx, d - 1, b)?
    )
}

fn try_catch(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let body = statement_list(ctx, d - 1, b)?;
    let (head, names) = match ctx.below(4) {
        0 => (String::new(), Vec::new()),
        1 => {
            let (pattern, names) = destructuring_pattern(ctx, d - 1, b)?;
            (format!("({pattern}) "), names)
        }
        _ => {
            let name = fresh_name(ctx)?;
            (format!("({name}) "), vec![name])
        }
    };
    let inner = b.with_all(names);
    let handler = statement_list(ctx, d - 1, &inner)?;
    let finalizer = if ctx.chance(3) {
        format!(" finally {{ {} }}", statement_list(ctx, d - 1, b)?)
    } else {
        String::new()
    };
    cat!(
        ctx,
        "try { ",
        body,
        " } catch ",
        head,
        "{ ",
        handler,
        " }",
        finalizer
    )
}

fn try_finally(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(
        ctx,
        "try { ",
        statement_list(ctx, d - 1, b)?,
        " } finally { ",
        statement_list(ctx, d - 1, b)?,
        " }"
    )
}

fn throw(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "throw ", ctx.expr(d - 1, b)?, ";")
}

fn return_statement(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "return ", ctx.expr(d - 1, b)?, ";")
}

fn with(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, "with (", ctx.expr(d - 1, b)?, ") ", ctx.statement(d - 1, b)?)
}

fn function_declaration(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    declaration(ctx, d, b)
}

fn expression(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    cat!(ctx, ctx.expr(d - 1, b)?, ";")
}

fn eval_statement(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    let source = compiled_source(ctx, d - 1, b)?;
    cat!(ctx, "eval(", super::quote(&source), ");")
}
