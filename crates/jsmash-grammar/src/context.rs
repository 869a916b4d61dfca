//! Generation context: dispatch, escape hatch and binding reuse.

use jsmash_core::{choose_uniform, Mt19937};
use tracing::trace;

use crate::bindings::Bindings;
use crate::error::GeneratorResult;
use crate::grammar::{Category, Grammar, ProductionKind};
use crate::options::GrammarOptions;

/// Above this distance from the floor, terminal productions are never forced.
pub(crate) const TERMINAL_RAMP: u32 = 8;

/// Escape hatches that may be active on the stack at once. Dispatches and
/// torture splices nested deeper than this do not escape again.
pub const MAX_ESCAPE_NESTING: u32 = 4;

/// A reused binding observed during generation, with the context it was
/// drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingUse {
    pub name: String,
    pub visible: Bindings,
}

/// State threaded through every production of one generation.
///
/// Holds the random source by mutable borrow, so draws happen strictly in
/// call order.
pub struct GenCtx<'a> {
    rng: &'a mut Mt19937,
    grammar: &'a Grammar,
    options: &'a GrammarOptions,
    calls: u64,
    escapes: u32,
    audit: Option<Vec<BindingUse>>,
}

impl<'a> GenCtx<'a> {
    pub fn new(rng: &'a mut Mt19937, grammar: &'a Grammar, options: &'a GrammarOptions) -> Self {
        Self {
            rng,
            grammar,
            options,
            calls: 0,
            escapes: 0,
            audit: None,
        }
    }

    pub fn options(&self) -> &GrammarOptions {
        self.options
    }

    /// Direct access to the random source.
    pub fn rng(&mut self) -> &mut Mt19937 {
        &mut *self.rng
    }

    /// Number of dispatches performed so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Start recording every reused binding.
    pub fn record_binding_uses(&mut self) {
        self.audit = Some(Vec::new());
    }

    /// Take the recorded binding uses.
    pub fn take_binding_uses(&mut self) -> Vec<BindingUse> {
        self.audit.take().unwrap_or_default()
    }

    /// Integer in `[0, n)`. One draw.
    pub fn below(&mut self, n: u32) -> u32 {
        self.rng.below(n)
    }

    /// True with probability `1/n`. One draw.
    pub fn chance(&mut self, n: u32) -> bool {
        self.rng.chance(n)
    }

    /// True with probability `p`. One draw.
    pub fn bool_with(&mut self, p: f64) -> bool {
        self.rng.bool_with(p)
    }

    /// Pick one item uniformly. One draw.
    pub fn pick(&mut self, items: &[&'static str]) -> GeneratorResult<&'static str> {
        Ok(*choose_uniform(items, self.rng)?)
    }

    fn exhausted(&self) -> bool {
        self.calls > self.options.max_calls
    }

    /// Whether another escape hatch may be entered.
    pub fn can_escape(&self) -> bool {
        self.escapes < MAX_ESCAPE_NESTING
    }

    /// Generate one production of `category` within `depth`.
    pub fn dispatch(
        &mut self,
        category: Category,
        depth: i32,
        bindings: &Bindings,
    ) -> GeneratorResult<String> {
        self.calls += 1;
        let exhausted = self.exhausted();

        if !exhausted
            && self.can_escape()
            && self.rng.bool_with(self.options.escape_hatch_probability)
        {
            return self.escape_hatch(depth, bindings);
        }

        let floor = self.options.depth_floor;
        let terminal_only = exhausted
            || depth <= floor
            || i64::from(self.rng.below(TERMINAL_RAMP)) > i64::from(depth) - i64::from(floor);

        let grammar = self.grammar;
        let production = grammar.table(category).pick(self.rng, terminal_only);

        let depth = if category.rerolls_depth() && production.kind == ProductionKind::Recursive {
            let span = u32::try_from(depth - floor).unwrap_or(0);
            floor + self.rng.below(span) as i32
        } else {
            depth
        };

        (production.make)(self, depth, bindings)
    }

    /// Run a generator chosen uniformly from the whole registry, with the
    /// depth jittered by up to two in either direction.
    ///
    /// Callers check [`GenCtx::can_escape`] first.
    pub fn escape_hatch(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        let grammar = self.grammar;
        let entry = *choose_uniform(grammar.registry().entries(), self.rng)?;
        let jittered = depth + self.rng.below(5) as i32 - 2;
        trace!(
            generator = entry.name,
            depth = jittered,
            nesting = self.escapes,
            "escape hatch"
        );
        self.escapes += 1;
        let result = (entry.make)(self, jittered, bindings);
        self.escapes -= 1;
        result
    }

    /// Reuse an in-scope binding with the configured probability.
    ///
    /// One draw, plus one more when a binding is reused.
    pub fn reuse_binding(&mut self, bindings: &Bindings) -> Option<String> {
        let wanted = self.rng.bool_with(self.options.reuse_binding_probability);
        if !wanted || bindings.is_empty() {
            return None;
        }
        let index = self.rng.below(bindings.len() as u32) as usize;
        let name = bindings.names()[index].clone();
        if let Some(audit) = self.audit.as_mut() {
            audit.push(BindingUse {
                name: name.clone(),
                visible: bindings.clone(),
            });
        }
        Some(name)
    }

    pub fn statement(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::Statement, depth, bindings)
    }

    pub fn expr(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::Expr, depth, bindings)
    }

    pub fn function(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::Function, depth, bindings)
    }

    pub fn id(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::Id, depth, bindings)
    }

    pub fn lvalue(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::LValue, depth, bindings)
    }

    pub fn term(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::Term, depth, bindings)
    }

    pub fn regex(&mut self, depth: i32, bindings: &Bindings) -> GeneratorResult<String> {
        self.dispatch(Category::Regex, depth, bindings)
    }
}

impl std::fmt::Debug for GenCtx<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenCtx")
            .field("calls", &self.calls)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Engine;
    use crate::registry::BUILTIN_GENERATORS;

    #[test]
    fn test_every_generator_terminates_at_every_depth() {
        let engine = Engine::new(GrammarOptions::default()).unwrap();
        let bindings = Bindings::from_names(["x", "y"]);
        let budget = engine.options().max_calls;

        for entry in BUILTIN_GENERATORS {
            for depth in 0..=50 {
                let mut rng = Mt19937::new(depth as u32 * 7919 + entry.name.len() as u32);
                let mut ctx = engine.context(&mut rng);
                let result = (entry.make)(&mut ctx, depth, &bindings);
                assert!(result.is_ok(), "{} at depth {depth}: {result:?}", entry.name);
                assert!(ctx.calls() <= budget * 2, "{} made {} calls", entry.name, ctx.calls());
            }
        }
    }

    #[test]
    fn test_reused_bindings_are_in_scope() {
        let options = GrammarOptions {
            reuse_binding_probability: 0.9,
            ..GrammarOptions::default()
        };
        let engine = Engine::new(options).unwrap();
        let outer = Bindings::from_names(["outer1", "outer2"]);

        let mut total_uses = 0;
        for seed in 0..200 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            ctx.record_binding_uses();
            ctx.statement(12, &outer).unwrap();

            for used in ctx.take_binding_uses() {
                total_uses += 1;
                assert!(
                    used.visible.contains(&used.name),
                    "{} reused outside {}",
                    used.name,
                    used.visible
                );
            }
        }
        assert!(total_uses > 0);
    }

    #[test]
    fn test_floor_forces_terminals() {
        let engine = Engine::new(GrammarOptions::quiet()).unwrap();
        for seed in 0..100 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            ctx.expr(0, &Bindings::new()).unwrap();
            // A terminal expression dispatches to at most a term and an id.
            assert!(ctx.calls() <= 3, "seed {seed}: {} calls", ctx.calls());
        }
    }

    #[test]
    fn test_exhausted_budget_still_completes() {
        let options = GrammarOptions {
            max_calls: 1,
            ..GrammarOptions::quiet()
        };
        let engine = Engine::new(options).unwrap();
        let mut rng = Mt19937::new(5);
        let mut ctx = engine.context(&mut rng);
        assert!(ctx.statement(50, &Bindings::new()).is_ok());
    }

    #[test]
    fn test_escape_hatch_always_taken() {
        let options = GrammarOptions {
            escape_hatch_probability: 1.0,
            max_calls: 50,
            ..GrammarOptions::quiet()
        };
        let engine = Engine::new(options).unwrap();
        let mut rng = Mt19937::new(11);
        let mut ctx = engine.context(&mut rng);
        // Every dispatch escapes until the budget is spent.
        assert!(ctx.id(3, &Bindings::new()).is_ok());
        assert!(ctx.calls() > 1);
    }

    #[test]
    fn test_escape_nesting_is_bounded() {
        let options = GrammarOptions {
            escape_hatch_probability: 1.0,
            ..GrammarOptions::default()
        };
        let engine = Engine::new(options).unwrap();
        assert_eq!(engine.options().max_calls, crate::options::DEFAULT_MAX_CALLS);

        for seed in 0..20 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            let result = ctx.statement(10, &Bindings::new());
            assert!(result.is_ok(), "seed {seed}: {result:?}");
            assert!(ctx.can_escape(), "seed {seed}: nesting not unwound");
        }
    }

    #[test]
    fn test_escape_and_torture_together_terminate() {
        let options = GrammarOptions {
            escape_hatch_probability: 1.0,
            torture_probability: 1.0,
            ..GrammarOptions::default()
        };
        let engine = Engine::new(options).unwrap();
        for seed in 0..20 {
            let mut rng = Mt19937::new(seed);
            let mut ctx = engine.context(&mut rng);
            assert!(ctx.statement(10, &Bindings::new()).is_ok(), "seed {seed}");
        }
    }
}
