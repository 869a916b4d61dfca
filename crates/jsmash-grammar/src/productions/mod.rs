//! The built-in scripting grammar.

mod exprs;
mod functions;
mod ids;
mod statements;
mod terms;

use crate::bindings::Bindings;
use crate::context::GenCtx;
use crate::error::GeneratorResult;
use crate::grammar::{Category, Production};

pub(crate) use exprs::{array_literal, object_literal, template_literal};
pub(crate) use functions::{formal_args, function_body, iife};
pub(crate) use ids::destructuring_pattern;
pub(crate) use statements::{compiled_source, statement_list, switch_body};
pub(crate) use terms::{number_literal, string_literal};

/// Production table for a category.
pub(crate) fn builtin(category: Category) -> &'static [Production] {
    match category {
        Category::Statement => statements::STATEMENTS,
        Category::Expr => exprs::EXPRS,
        Category::Function => functions::FUNCTIONS,
        Category::Id => ids::IDS,
        Category::LValue => ids::LVALUES,
        Category::Term => terms::TERMS,
        Category::Regex => terms::REGEXES,
    }
}

/// Quote `text` as a double-quoted string literal.
pub(crate) fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub(crate) fn make_statement(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.statement(d, b)
}

pub(crate) fn make_expr(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.expr(d, b)
}

pub(crate) fn make_function(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.function(d, b)
}

pub(crate) fn make_id(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.id(d, b)
}

pub(crate) fn make_lvalue(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.lvalue(d, b)
}

pub(crate) fn make_term(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.term(d, b)
}

pub(crate) fn make_regex(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    ctx.regex(d, b)
}

pub(crate) fn make_formal_args(ctx: &mut GenCtx<'_>, d: i32, b: &Bindings) -> GeneratorResult<String> {
    Ok(formal_args(ctx, d, b)?.0)
}

pub(crate) fn make_destructuring(
    ctx: &mut GenCtx<'_>,
    d: i32,
    b: &Bindings,
) -> GeneratorResult<String> {
    Ok(destructuring_pattern(ctx, d, b)?.0)
}
