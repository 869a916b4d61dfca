//! Explicit list of generators reachable from the escape hatch.

use std::collections::HashSet;
use std::fmt;

use crate::bindings::Bindings;
use crate::context::GenCtx;
use crate::error::{GeneratorResult, GrammarError};
use crate::productions as p;

/// A generator: depth budget and bindings in, text out.
pub type MakerFn = fn(&mut GenCtx<'_>, i32, &Bindings) -> GeneratorResult<String>;

/// A named generator.
#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub name: &'static str,
    pub make: MakerFn,
}

impl RegistryEntry {
    pub const fn new(name: &'static str, make: MakerFn) -> Self {
        Self { name, make }
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegistryEntry").field(&self.name).finish()
    }
}

/// Every generator the built-in grammar exposes, category roots first.
pub static BUILTIN_GENERATORS: &[RegistryEntry] = &[
    RegistryEntry::new("statement", p::make_statement),
    RegistryEntry::new("expr", p::make_expr),
    RegistryEntry::new("function", p::make_function),
    RegistryEntry::new("id", p::make_id),
    RegistryEntry::new("lvalue", p::make_lvalue),
    RegistryEntry::new("term", p::make_term),
    RegistryEntry::new("regex", p::make_regex),
    RegistryEntry::new("statement_list", p::statement_list),
    RegistryEntry::new("switch_body", p::switch_body),
    RegistryEntry::new("compiled_source", p::compiled_source),
    RegistryEntry::new("function_body", p::function_body),
    RegistryEntry::new("formal_args", p::make_formal_args),
    RegistryEntry::new("iife", p::iife),
    RegistryEntry::new("destructuring_pattern", p::make_destructuring),
    RegistryEntry::new("array_literal", p::array_literal),
    RegistryEntry::new("object_literal", p::object_literal),
    RegistryEntry::new("template_literal", p::template_literal),
    RegistryEntry::new("number_literal", p::number_literal),
    RegistryEntry::new("string_literal", p::string_literal),
];

/// The generators available to the escape hatch.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Build a registry, rejecting empty lists and duplicate names.
    pub fn new(entries: Vec<RegistryEntry>) -> GeneratorResult<Self> {
        if entries.is_empty() {
            return Err(GrammarError::EmptyRegistry);
        }
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.name) {
                return Err(GrammarError::DuplicateGenerator {
                    name: entry.name.to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn builtin() -> GeneratorResult<Self> {
        Self::new(BUILTIN_GENERATORS.to_vec())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
