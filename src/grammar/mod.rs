//! Weighted-choice grammar engine
//!
//! The grammar is a network of mutually-recursive productions. Each
//! production receives a depth budget and the set of identifier names
//! bound in the enclosing generated scope, and returns one fragment of
//! source text. Productions are grouped into weighted alternative sets;
//! selecting from a group consumes exactly one PRNG draw.
//!
//! Termination is probabilistic, not proven: most recursive productions
//! shrink the budget by 1-3, several re-roll it to `rnd(d)` (which can
//! locally exceed a strict decrement), leaves ignore it entirely, and the
//! chaos dispatcher may even perturb it upward. A separate absolute
//! nesting ceiling backstops the rare pathological path without changing
//! the sampled distribution in the common case.

pub mod asmjs;
pub mod exprs;
pub mod literals;
pub mod mathy;
pub mod proxies;
pub mod recursion;
pub mod regex;
pub mod statements;
pub mod typeaware;

use crate::capabilities::CapabilitySet;
use crate::corpus::RegressionCorpus;
use crate::error::{Error, Result};
use crate::random::SeededRng;

/// Chaos frequency: 1-in-this at the start of every production, the
/// structured grammar is bypassed entirely.
pub const CHAOS_ONE_IN: u64 = 1000;

/// Absolute ceiling on production nesting. The depth budget is the
/// semantic bound; this one exists only because re-rolled budgets and
/// chaos perturbation make the semantic bound probabilistic.
const MAX_NEST: u32 = 300;

/// Ordered set of identifier names in scope for a generated fragment.
///
/// Extension is by value: a production that introduces a name builds a
/// new set for the sub-productions inside the name's scope and keeps
/// passing the original set everywhere else. Duplicates are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    names: Vec<String>,
}

impl Bindings {
    /// The empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a fixed name list.
    #[must_use]
    pub fn from_names(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Number of names in scope.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no names are in scope.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All names, in introduction order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// A new set with `name` appended.
    #[must_use]
    pub fn with(&self, name: impl Into<String>) -> Self {
        let mut names = self.names.clone();
        names.push(name.into());
        Self { names }
    }

    /// A new set with every name in `extra` appended.
    #[must_use]
    pub fn with_all(&self, extra: &[String]) -> Self {
        let mut names = self.names.clone();
        names.extend_from_slice(extra);
        Self { names }
    }

    /// Uniformly pick one in-scope name, if any.
    pub fn choose(&self, rng: &mut SeededRng) -> Option<&str> {
        if self.names.is_empty() {
            return None;
        }
        Some(rng.index(&self.names).as_str())
    }

    /// Whether `name` is in scope.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// A production: one fragment generator. Total for every input, including
/// negative depth and empty bindings; the empty string is a valid result.
pub type Production = fn(&mut Gen<'_>, i64, &Bindings) -> String;

/// Ordered weighted alternatives; selection probability of alternative
/// *i* is `weight_i / total`.
#[derive(Clone)]
pub struct WeightedSet {
    alts: Vec<(u32, Production)>,
    total: u64,
}

impl std::fmt::Debug for WeightedSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedSet")
            .field("alternatives", &self.alts.len())
            .field("total", &self.total)
            .finish()
    }
}

impl WeightedSet {
    /// Build from `(weight, production)` pairs.
    ///
    /// # Errors
    /// A zero total weight means the table is malformed.
    pub fn new(alts: Vec<(u32, Production)>) -> Result<Self> {
        let total: u64 = alts.iter().map(|(w, _)| u64::from(*w)).sum();
        if total == 0 {
            return Err(Error::Grammar(
                "weighted set has zero total weight".to_string(),
            ));
        }
        Ok(Self { alts, total })
    }

    /// Build with every weight equal to 1.
    pub fn uniform(prods: Vec<Production>) -> Result<Self> {
        Self::new(prods.into_iter().map(|p| (1, p)).collect())
    }

    /// Number of alternatives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.alts.len()
    }

    /// Whether the set is empty (never true for a constructed set).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alts.is_empty()
    }

    /// Pick one production. Consumes exactly one PRNG draw.
    pub fn pick(&self, rng: &mut SeededRng) -> Production {
        let mut roll = rng.next(self.total);
        for (w, p) in &self.alts {
            let w = u64::from(*w);
            if roll < w {
                return *p;
            }
            roll -= w;
        }
        // Unreachable: roll < total and the weights sum to total.
        self.alts[self.alts.len() - 1].1
    }

    /// Index of the picked alternative (for calibration tests).
    pub fn pick_index(&self, rng: &mut SeededRng) -> usize {
        let mut roll = rng.next(self.total);
        for (i, (w, _)) in self.alts.iter().enumerate() {
            let w = u64::from(*w);
            if roll < w {
                return i;
            }
            roll -= w;
        }
        self.alts.len() - 1
    }

    /// The static weights, in order.
    #[must_use]
    pub fn weights(&self) -> Vec<u32> {
        self.alts.iter().map(|(w, _)| *w).collect()
    }
}

/// All grammar groups plus the chaos registry. Built once by
/// [`build_grammar`], immutable afterwards, shareable across threads as
/// long as each worker owns its own [`SeededRng`].
pub struct GrammarTables {
    pub(crate) caps: CapabilitySet,
    pub(crate) statements: WeightedSet,
    pub(crate) little_statements: WeightedSet,
    pub(crate) statement_blocks: WeightedSet,
    pub(crate) exceptiony_statements: WeightedSet,
    pub(crate) exprs: WeightedSet,
    pub(crate) lvalues: WeightedSet,
    pub(crate) destructuring_lvalues: WeightedSet,
    pub(crate) terms: WeightedSet,
    pub(crate) functions: WeightedSet,
    pub(crate) iterables: WeightedSet,
    pub(crate) property_names: WeightedSet,
    pub(crate) builder_statements: WeightedSet,
    pub(crate) testing_calls: WeightedSet,
    pub(crate) templates: Vec<recursion::RecursiveTemplate>,
    registry: Vec<(&'static str, Production)>,
}

impl std::fmt::Debug for GrammarTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarTables")
            .field("statements", &self.statements.len())
            .field("exprs", &self.exprs.len())
            .field("registry", &self.registry.len())
            .finish()
    }
}

impl GrammarTables {
    /// The chaos registry: every registered producer with its name.
    #[must_use]
    pub fn registry(&self) -> &[(&'static str, Production)] {
        &self.registry
    }

    /// The capability set the tables were built for.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.caps
    }
}

/// Build the full grammar for a capability profile.
///
/// This is the only place grammar tables are assembled: capability-gated
/// alternatives are appended here, recursive-function templates run their
/// self-tests here, and the result is immutable.
///
/// # Errors
/// Returns [`Error::Template`] if any recursive-function template fails
/// its self-test, or [`Error::Grammar`] for a malformed table.
pub fn build_grammar(caps: &CapabilitySet) -> Result<GrammarTables> {
    let templates = recursion::validated_templates()?;

    let tables = GrammarTables {
        caps: caps.clone(),
        statements: WeightedSet::new(statements::statement_makers(caps))?,
        little_statements: WeightedSet::uniform(statements::little_statement_makers())?,
        statement_blocks: WeightedSet::uniform(statements::statement_block_makers())?,
        exceptiony_statements: WeightedSet::uniform(statements::exceptiony_statement_makers())?,
        exprs: WeightedSet::uniform(exprs::expr_makers(caps))?,
        lvalues: WeightedSet::uniform(exprs::lvalue_makers())?,
        destructuring_lvalues: WeightedSet::uniform(exprs::destructuring_lvalue_makers())?,
        terms: WeightedSet::uniform(exprs::term_makers())?,
        functions: WeightedSet::uniform(exprs::function_makers(caps))?,
        iterables: WeightedSet::new(exprs::iterable_makers())?,
        property_names: WeightedSet::new(exprs::property_name_makers())?,
        builder_statements: WeightedSet::new(typeaware::builder_statement_makers(caps))?,
        testing_calls: WeightedSet::new(statements::testing_call_makers(caps))?,
        templates,
        registry: registry(),
    };
    log::info!(
        "grammar built: {} statement alts, {} expr alts, {} registered producers",
        tables.statements.len(),
        tables.exprs.len(),
        tables.registry.len()
    );
    Ok(tables)
}

/// The explicit producer registry the chaos dispatcher indexes into.
///
/// Deliberately includes producers for every grammar category, not just
/// "sensible" ones: the point is to reach interactions the structured
/// grammar would never compose.
fn registry() -> Vec<(&'static str, Production)> {
    vec![
        ("make_statement", |g, d, b| g.make_statement(d, b)),
        ("make_little_statement", |g, d, b| {
            g.make_little_statement(d, b)
        }),
        ("make_statement_or_block", |g, d, b| {
            g.make_statement_or_block(d, b)
        }),
        ("make_exceptiony_statement", |g, d, b| {
            g.make_exceptiony_statement(d, b)
        }),
        ("make_try_block", |g, d, b| g.make_try_block(d, b)),
        ("make_switch_body", |g, d, b| g.make_switch_body(d, b)),
        ("make_expr", |g, d, b| g.make_expr(d, b)),
        ("make_term", |g, d, b| g.make_term(d, b)),
        ("make_lvalue", |g, d, b| g.make_lvalue(d, b)),
        ("make_destructuring_lvalue", |g, d, b| {
            g.make_destructuring_lvalue(d, b)
        }),
        ("make_function", |g, d, b| g.make_function(d, b)),
        ("make_function_body", |g, d, b| g.make_function_body(d, b)),
        ("make_formal_arg_list", |g, d, b| {
            g.make_formal_arg_list(d, b)
        }),
        ("make_actual_arg_list", |g, d, b| {
            g.make_actual_arg_list(d, b)
        }),
        ("make_id", |g, d, b| g.make_id(d, b)),
        ("make_new_id", |g, d, b| g.make_new_id(d, b)),
        ("make_number", |g, d, b| g.make_number(d, b)),
        ("make_boolean", |g, d, b| g.make_boolean(d, b)),
        ("make_iterable", |g, d, b| g.make_iterable(d, b)),
        ("make_array_literal", |g, d, b| g.make_array_literal(d, b)),
        ("make_mixed_type_array", |g, d, b| {
            g.make_mixed_type_array(d, b)
        }),
        ("make_shapey_value", |g, d, b| g.make_shapey_value(d, b)),
        ("make_obj_literal_part", |g, d, b| {
            g.make_obj_literal_part(d, b)
        }),
        ("make_property_name", |g, d, b| g.make_property_name(d, b)),
        ("make_property_descriptor", |g, d, b| {
            g.make_property_descriptor(d, b)
        }),
        ("make_let_head", |g, d, b| g.make_let_head(d, b)),
        ("make_global", |g, d, b| g.make_global(d, b)),
        ("make_testing_call", |g, d, b| g.make_testing_call(d, b)),
        ("make_typed_array_statements", |g, d, b| {
            g.make_typed_array_statements(d, b)
        }),
        ("make_print_statement", |g, d, b| {
            g.make_print_statement(d, b)
        }),
        ("make_builder_statement", |g, d, b| {
            g.make_builder_statement(d, b)
        }),
        ("make_evil_callback", |g, d, b| g.make_evil_callback(d, b)),
        ("make_math_expr", |g, d, b| g.make_math_expr(d, b, 5)),
        ("make_math_function", |g, d, b| g.make_math_function(d, b, 5)),
        ("make_mathy_fun_and_test", |g, d, b| {
            g.make_mathy_fun_and_test(d, b)
        }),
        ("make_mathy_fun_ref", |g, d, b| g.make_mathy_fun_ref(d, b)),
        ("make_asmjs_module", |g, d, b| g.make_asmjs_module(d, b)),
        ("make_asmjs_function", |g, d, b| g.make_asmjs_function(d, b)),
        ("make_asm_expr", |g, d, _b| {
            let tag = *g.rng.index(asmjs::NumericTypeTag::all());
            let mut env = asmjs::scratch_env();
            asmjs::asm_expr_of(g, d, &mut env, tag)
        }),
        ("make_proxy_handler", |g, d, b| g.make_proxy_handler(d, b)),
        ("make_proxy_handler_factory", |g, d, b| {
            g.make_proxy_handler_factory(d, b).0
        }),
        ("make_shapey_constructor", |g, d, b| {
            g.make_shapey_constructor(d, b)
        }),
        ("make_shapey_constructor_loop", |g, d, b| {
            g.make_shapey_constructor_loop(d, b)
        }),
        ("make_regex", |g, d, b| g.make_regex(d, b)),
        ("make_regex_use_block", |g, d, b| {
            g.make_regex_use_block(d, b)
        }),
        ("make_regex_use_expr", |g, d, b| g.make_regex_use_expr(d, b)),
        ("make_immediate_recursive_call", |g, d, b| {
            g.make_immediate_recursive_call(d, b)
        }),
        ("make_use_regression_test", |g, d, b| {
            g.make_use_regression_test(d, b)
        }),
        ("make_register_stomp_body", |g, d, b| {
            g.make_register_stomp_body(d, b)
        }),
        ("make_script_for_eval", |g, d, b| {
            g.make_script_for_eval(d, b)
        }),
        ("make_script", |g, d, b| g.make_script(d, b)),
    ]
}

/// One generation pass: the PRNG, the (shared, read-only) tables, and the
/// per-call nesting counter.
pub struct Gen<'a> {
    /// Random source; the only sequential state in the system.
    pub rng: &'a mut SeededRng,
    /// Immutable grammar tables.
    pub tables: &'a GrammarTables,
    /// Optional regression-test corpus.
    pub corpus: Option<&'a dyn RegressionCorpus>,
    pub(crate) chaos_one_in: u64,
    pub(crate) chaos_hits: u64,
    nest: u32,
}

impl<'a> Gen<'a> {
    /// Start a generation pass.
    pub fn new(rng: &'a mut SeededRng, tables: &'a GrammarTables) -> Self {
        Self {
            rng,
            tables,
            corpus: None,
            chaos_one_in: CHAOS_ONE_IN,
            chaos_hits: 0,
            nest: 0,
        }
    }

    /// Attach a regression-test corpus.
    #[must_use]
    pub fn with_corpus(mut self, corpus: &'a dyn RegressionCorpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Override the chaos frequency (used by calibration tests).
    #[must_use]
    pub fn with_chaos_one_in(mut self, n: u64) -> Self {
        self.chaos_one_in = n;
        self
    }

    /// How many times the chaos dispatcher fired during this pass.
    #[must_use]
    pub fn chaos_hits(&self) -> u64 {
        self.chaos_hits
    }

    /// Chaos check, run at the start of every production: with probability
    /// `1/chaos_one_in`, perturb the depth by a small delta (which may
    /// *increase* it) and invoke an arbitrary producer from the registry.
    pub(crate) fn chaos(&mut self, d: i64, b: &Bindings) -> Option<String> {
        if self.nest >= MAX_NEST {
            return None;
        }
        if self.rng.next(self.chaos_one_in) != 2 {
            return None;
        }
        Some(self.chaos_dispatch(d, b))
    }

    /// The dispatch itself, without the frequency gate; a few productions
    /// (asm module interiors) invoke it at their own rate.
    pub(crate) fn chaos_dispatch(&mut self, d: i64, b: &Bindings) -> String {
        self.chaos_hits += 1;
        let d = d + self.rng.next(5) as i64 - 2;
        let i = self.rng.next(self.tables.registry.len() as u64) as usize;
        let (name, producer) = self.tables.registry[i];
        log::debug!("chaos dispatch -> {name} (depth {d})");
        producer(self, d, b)
    }

    /// Whether the absolute nesting ceiling has been reached.
    pub(crate) fn over_ceiling(&self) -> bool {
        self.nest >= MAX_NEST
    }

    /// Run `inner` one nesting level deeper. All recursion cycles in the
    /// grammar pass through a dispatcher that calls this.
    pub(crate) fn nested<T, F: FnOnce(&mut Self) -> T>(&mut self, inner: F) -> T {
        self.nest += 1;
        let out = inner(self);
        self.nest -= 1;
        out
    }

    /// Zero-recursion fallback used when the nesting ceiling is hit.
    pub(crate) fn leaf_fallback(&mut self, b: &Bindings) -> String {
        if self.rng.next(3) == 1 {
            if let Some(name) = b.choose(self.rng) {
                return name.to_string();
            }
        }
        literals::SIMPLE_TERMS[self.rng.next(literals::SIMPLE_TERMS.len() as u64) as usize]
            .to_string()
    }
}

impl std::fmt::Debug for Gen<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gen")
            .field("nest", &self.nest)
            .field("chaos_hits", &self.chaos_hits)
            .finish()
    }
}

/// Remove a trailing semicolon (and surrounding spaces), if present.
#[must_use]
pub(crate) fn strip_semicolon(s: &str) -> String {
    let trimmed = s.trim_end();
    trimmed.strip_suffix(';').unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> GrammarTables {
        build_grammar(&CapabilitySet::none()).expect("grammar should build")
    }

    #[test]
    fn test_bindings_with_does_not_mutate() {
        let b = Bindings::from_names(&["x"]);
        let extended = b.with("y");
        assert_eq!(b.len(), 1);
        assert_eq!(extended.len(), 2);
        assert!(extended.contains("y"));
        assert!(!b.contains("y"));
    }

    #[test]
    fn test_bindings_choose_empty() {
        let b = Bindings::new();
        let mut rng = SeededRng::from_seed(1);
        assert!(b.choose(&mut rng).is_none());
    }

    #[test]
    fn test_weighted_set_rejects_zero_total() {
        let alts: Vec<(u32, Production)> = vec![(0, |_, _, _| String::new())];
        assert!(WeightedSet::new(alts).is_err());
    }

    #[test]
    fn test_weighted_set_single_alternative_always_picked() {
        let set = WeightedSet::new(vec![(7, (|_, _, _| "only".to_string()) as Production)])
            .expect("valid set");
        let mut rng = SeededRng::from_seed(9);
        for _ in 0..100 {
            assert_eq!(set.pick_index(&mut rng), 0);
        }
    }

    #[test]
    fn test_weighted_pick_consumes_one_draw() {
        let set = WeightedSet::new(vec![
            (3, (|_, _, _| String::new()) as Production),
            (5, (|_, _, _| String::new()) as Production),
        ])
        .expect("valid set");
        let mut rng = SeededRng::from_seed(4);
        let before = rng.draws();
        set.pick(&mut rng);
        assert_eq!(rng.draws(), before + 1);
    }

    #[test]
    fn test_build_grammar_succeeds_without_capabilities() {
        let t = tables();
        assert!(t.statements.len() > 30);
        assert!(t.exprs.len() > 40);
        assert!(t.registry().len() > 40);
    }

    #[test]
    fn test_capabilities_extend_groups() {
        let narrow = build_grammar(&CapabilitySet::none()).unwrap();
        let wide = build_grammar(&CapabilitySet::spidermonkey_shell()).unwrap();
        assert!(wide.statements.len() > narrow.statements.len());
        assert!(wide.exprs.len() > narrow.exprs.len());
        assert!(wide.functions.len() > narrow.functions.len());
    }

    #[test]
    fn test_strip_semicolon() {
        assert_eq!(strip_semicolon("x = 1;"), "x = 1");
        assert_eq!(strip_semicolon("x = 1; "), "x = 1");
        assert_eq!(strip_semicolon("x = 1"), "x = 1");
        assert_eq!(strip_semicolon(""), "");
    }

    #[test]
    fn test_chaos_dispatch_fires_and_returns_string() {
        let t = tables();
        let mut rng = SeededRng::from_seed(8);
        let mut g = Gen::new(&mut rng, &t).with_chaos_one_in(3);
        let b = Bindings::from_names(&["x"]);
        let mut fired = 0;
        for _ in 0..200 {
            if g.chaos(3, &b).is_some() {
                fired += 1;
            }
        }
        assert!(fired > 20, "chaos should fire roughly 1-in-3, got {fired}");
        // nested dispatches inside a dispatched producer also count
        assert!(g.chaos_hits() >= fired);
    }

    #[test]
    fn test_leaf_fallback_total_on_empty_bindings() {
        let t = tables();
        let mut rng = SeededRng::from_seed(2);
        let mut g = Gen::new(&mut rng, &t);
        let b = Bindings::new();
        for _ in 0..50 {
            let s = g.leaf_fallback(&b);
            assert!(!s.is_empty());
        }
    }
}
