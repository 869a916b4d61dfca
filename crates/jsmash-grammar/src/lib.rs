//! jsmash Grammar - Weighted recursive generation of scripting-language snippets
//!
//! This crate turns a stream of draws from [`jsmash_core::Mt19937`] into
//! syntactically varied, frequently invalid, program text.
//!
//! # Core Concepts
//!
//! - [`Engine`]: Owns the grammar tables and options, entry point for callers
//! - [`GenCtx`]: Per-generation context threaded through every production
//! - [`Bindings`]: Copy-on-extend list of identifier names in scope
//! - [`Fragment`]: Input to the token assembler ([`GenCtx::cat`] and [`cat!`])
//! - [`Registry`]: Explicit list of generators used by the escape hatch
//!
//! # Categories
//!
//! Productions are grouped in [`Category`] tables: statements, expressions,
//! functions, identifiers, assignment targets, terms and regular expressions.
//! Each table holds at least one terminal production so that generation
//! bottoms out once the depth budget reaches the configured floor.
//!
//! # Regular expressions
//!
//! [`regex_pattern`] builds a pattern together with candidate strings it
//! should match, threading captured-group samples through a [`RegexCtx`].

mod assembler;
mod bindings;
mod context;
mod error;
mod fragment;
mod grammar;
mod options;
mod productions;
mod regex;
mod registry;

pub use bindings::Bindings;
pub use context::{BindingUse, GenCtx, MAX_ESCAPE_NESTING};
pub use error::{GeneratorResult, GrammarError};
pub use fragment::Fragment;
pub use grammar::{Category, CategoryTable, Engine, Grammar, Production, ProductionKind};
pub use options::GrammarOptions;
pub use regex::{regex_pattern, RegexCtx, RegexResult};
pub use registry::{MakerFn, Registry, RegistryEntry, BUILTIN_GENERATORS};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bindings::Bindings;
    pub use crate::context::GenCtx;
    pub use crate::error::{GeneratorResult, GrammarError};
    pub use crate::fragment::Fragment;
    pub use crate::grammar::{Category, Engine};
    pub use crate::options::GrammarOptions;
    pub use jsmash_core::Mt19937;
}
