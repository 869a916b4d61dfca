//! Category tables and the engine that owns them.

use std::fmt;

use jsmash_core::{Mt19937, WeightedSet};
use serde::{Deserialize, Serialize};

use crate::bindings::Bindings;
use crate::context::GenCtx;
use crate::error::{GeneratorResult, GrammarError};
use crate::options::GrammarOptions;
use crate::productions;
use crate::registry::{MakerFn, Registry};

/// Grammatical position a production fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Statement,
    Expr,
    Function,
    Id,
    LValue,
    Term,
    Regex,
}

impl Category {
    /// Every category, in table order.
    pub const ALL: [Category; 7] = [
        Category::Statement,
        Category::Expr,
        Category::Function,
        Category::Id,
        Category::LValue,
        Category::Term,
        Category::Regex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Statement => "statement",
            Category::Expr => "expr",
            Category::Function => "function",
            Category::Id => "id",
            Category::LValue => "lvalue",
            Category::Term => "term",
            Category::Regex => "regex",
        }
    }

    /// Whether recursive productions of this category re-roll their depth
    /// to a uniformly smaller value before running.
    pub fn rerolls_depth(self) -> bool {
        matches!(
            self,
            Category::Statement | Category::Expr | Category::Function | Category::LValue
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a production may recurse into recursive categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionKind {
    /// Never descends below its own depth
    Terminal,
    /// Descends with a reduced depth budget
    Recursive,
}

/// One weighted alternative of a category.
#[derive(Clone, Copy)]
pub struct Production {
    pub name: &'static str,
    pub weight: u32,
    pub kind: ProductionKind,
    pub make: MakerFn,
}

impl Production {
    pub const fn terminal(name: &'static str, weight: u32, make: MakerFn) -> Self {
        Self {
            name,
            weight,
            kind: ProductionKind::Terminal,
            make,
        }
    }

    pub const fn recursive(name: &'static str, weight: u32, make: MakerFn) -> Self {
        Self {
            name,
            weight,
            kind: ProductionKind::Recursive,
            make,
        }
    }
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Production")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The productions of one category with precomputed selection sets.
#[derive(Debug)]
pub struct CategoryTable {
    category: Category,
    productions: Vec<Production>,
    all: WeightedSet<usize>,
    terminals: WeightedSet<usize>,
}

impl CategoryTable {
    /// Build a table, requiring at least one terminal production.
    pub fn new(category: Category, productions: &[Production]) -> GeneratorResult<Self> {
        if productions.is_empty() {
            return Err(GrammarError::EmptyCategory { category });
        }

        let all = WeightedSet::new(
            productions
                .iter()
                .enumerate()
                .map(|(i, p)| (p.weight, i)),
        )?;

        let terminal_pairs: Vec<(u32, usize)> = productions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == ProductionKind::Terminal)
            .map(|(i, p)| (p.weight, i))
            .collect();
        if terminal_pairs.is_empty() {
            return Err(GrammarError::NoTerminal { category });
        }
        let terminals = WeightedSet::new(terminal_pairs)?;

        Ok(Self {
            category,
            productions: productions.to_vec(),
            all,
            terminals,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// Pick a production. One draw.
    pub(crate) fn pick(&self, rng: &mut Mt19937, terminal_only: bool) -> Production {
        let index = if terminal_only {
            *self.terminals.choose(rng)
        } else {
            *self.all.choose(rng)
        };
        self.productions[index]
    }
}

/// Category tables plus the escape-hatch registry.
#[derive(Debug)]
pub struct Grammar {
    tables: Vec<CategoryTable>,
    registry: Registry,
}

impl Grammar {
    /// The built-in scripting grammar.
    pub fn builtin() -> GeneratorResult<Self> {
        Self::from_fn(productions::builtin, Registry::builtin()?)
    }

    /// Build a grammar from a per-category production lookup.
    pub fn from_fn<F>(lookup: F, registry: Registry) -> GeneratorResult<Self>
    where
        F: Fn(Category) -> &'static [Production],
    {
        let tables = Category::ALL
            .iter()
            .map(|&category| CategoryTable::new(category, lookup(category)))
            .collect::<GeneratorResult<Vec<_>>>()?;
        Ok(Self { tables, registry })
    }

    pub fn table(&self, category: Category) -> &CategoryTable {
        &self.tables[category.index()]
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// A grammar together with validated options.
///
/// The engine itself holds no random state: callers pass the generator in,
/// which keeps draw order under their control.
#[derive(Debug)]
pub struct Engine {
    grammar: Grammar,
    options: GrammarOptions,
}

impl Engine {
    /// An engine over the built-in grammar.
    pub fn new(options: GrammarOptions) -> GeneratorResult<Self> {
        Self::with_grammar(Grammar::builtin()?, options)
    }

    pub fn with_grammar(grammar: Grammar, options: GrammarOptions) -> GeneratorResult<Self> {
        options.validate()?;
        Ok(Self { grammar, options })
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn options(&self) -> &GrammarOptions {
        &self.options
    }

    /// A fresh generation context drawing from `rng`.
    pub fn context<'a>(&'a self, rng: &'a mut Mt19937) -> GenCtx<'a> {
        GenCtx::new(rng, &self.grammar, &self.options)
    }

    /// Generate one production of `category`.
    pub fn generate(
        &self,
        rng: &mut Mt19937,
        category: Category,
        depth: i32,
        bindings: &Bindings,
    ) -> GeneratorResult<String> {
        if depth < 0 {
            return Err(GrammarError::NegativeDepth { depth });
        }
        let mut ctx = self.context(rng);
        ctx.dispatch(category, depth, bindings)
    }

    /// Generate one top-level statement.
    pub fn generate_statement(
        &self,
        rng: &mut Mt19937,
        depth: i32,
        bindings: &Bindings,
    ) -> GeneratorResult<String> {
        self.generate(rng, Category::Statement, depth, bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(_ctx: &mut GenCtx<'_>, _depth: i32, _b: &Bindings) -> GeneratorResult<String> {
        Ok("leaf".to_string())
    }

    static ONLY_RECURSIVE: &[Production] = &[Production::recursive("loop", 1, leaf)];

    #[test]
    fn test_table_requires_terminal() {
        let err = CategoryTable::new(Category::Expr, ONLY_RECURSIVE).unwrap_err();
        assert_eq!(
            err,
            GrammarError::NoTerminal {
                category: Category::Expr
            }
        );
        assert!(matches!(
            CategoryTable::new(Category::Term, &[]),
            Err(GrammarError::EmptyCategory { .. })
        ));
    }

    #[test]
    fn test_builtin_tables_are_complete() {
        let grammar = Grammar::builtin().unwrap();
        for category in Category::ALL {
            let table = grammar.table(category);
            assert_eq!(table.category(), category);
            assert!(table
                .productions()
                .iter()
                .any(|p| p.kind == ProductionKind::Terminal));
        }
    }

    #[test]
    fn test_negative_depth_rejected() {
        let engine = Engine::new(GrammarOptions::default()).unwrap();
        let mut rng = Mt19937::new(1);
        assert_eq!(
            engine
                .generate(&mut rng, Category::Expr, -1, &Bindings::new())
                .unwrap_err(),
            GrammarError::NegativeDepth { depth: -1 }
        );
    }

    #[test]
    fn test_same_seed_same_text() {
        let engine = Engine::new(GrammarOptions::default()).unwrap();
        let bindings = Bindings::from_names(["x"]);
        for seed in 0..20 {
            let mut a = Mt19937::new(seed);
            let mut b = Mt19937::new(seed);
            assert_eq!(
                engine.generate_statement(&mut a, 10, &bindings).unwrap(),
                engine.generate_statement(&mut b, 10, &bindings).unwrap()
            );
            assert_eq!(a.export_state(), b.export_state());
        }
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = GrammarOptions {
            escape_hatch_probability: -0.1,
            ..GrammarOptions::default()
        };
        assert!(matches!(
            Engine::new(options),
            Err(GrammarError::InvalidOption { .. })
        ));
    }
}
