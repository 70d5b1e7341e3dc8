//! Top-level script assembly and the public generation API
//!
//! A [`Generator`] owns the one-time-built grammar tables, the PRNG (the
//! only sequential state in the system), and the optional regression
//! corpus. Building validates the grammar and runs the recursive-template
//! self-tests; generation afterwards is infallible and allocation-only.
//!
//! Concurrent generation is safe by construction: clone nothing, build
//! one `Generator` per worker with its own seed. The tables themselves
//! are immutable after construction and could be shared, but a whole
//! `Generator` per worker is cheap enough.

use crate::capabilities::CapabilitySet;
use crate::corpus::RegressionCorpus;
use crate::error::Result;
use crate::grammar::{build_grammar, Bindings, Gen, GrammarTables, CHAOS_ONE_IN};
use crate::random::{RngState, SeededRng};

/// Builder for [`Generator`].
pub struct GeneratorBuilder {
    seed: u64,
    capabilities: CapabilitySet,
    corpus: Option<Box<dyn RegressionCorpus>>,
    chaos_one_in: u64,
}

impl std::fmt::Debug for GeneratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorBuilder")
            .field("seed", &self.seed)
            .field("capabilities", &self.capabilities)
            .field("chaos_one_in", &self.chaos_one_in)
            .finish()
    }
}

impl GeneratorBuilder {
    /// The PRNG seed. The generator never chooses its own seed, so runs
    /// are externally reproducible.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Host capability profile, consumed once at build time.
    #[must_use]
    pub fn capabilities(mut self, caps: CapabilitySet) -> Self {
        self.capabilities = caps;
        self
    }

    /// Attach a regression-test corpus for the inlining alternative.
    #[must_use]
    pub fn corpus(mut self, corpus: Box<dyn RegressionCorpus>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Override the chaos frequency (1-in-`n`). Mostly for calibration
    /// tests; the shipped default is 1-in-1000.
    #[must_use]
    pub fn chaos_one_in(mut self, n: u64) -> Self {
        self.chaos_one_in = n;
        self
    }

    /// Build the grammar tables and validate them.
    ///
    /// # Errors
    /// Propagates grammar-construction failures and recursive-template
    /// self-test failures; both indicate the tables themselves are
    /// malformed, never that generated output would be bad.
    pub fn build(self) -> Result<Generator> {
        let tables = build_grammar(&self.capabilities)?;
        Ok(Generator {
            tables,
            rng: SeededRng::from_seed(self.seed),
            corpus: self.corpus,
            chaos_one_in: self.chaos_one_in,
            chaos_hits: 0,
        })
    }
}

/// Grammar-driven random program generator.
pub struct Generator {
    tables: GrammarTables,
    rng: SeededRng,
    corpus: Option<Box<dyn RegressionCorpus>>,
    chaos_one_in: u64,
    chaos_hits: u64,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("tables", &self.tables)
            .field("draws", &self.rng.draws())
            .field("chaos_hits", &self.chaos_hits)
            .finish()
    }
}

impl Generator {
    /// Start building a generator.
    #[must_use]
    pub fn builder() -> GeneratorBuilder {
        GeneratorBuilder {
            seed: 0,
            capabilities: CapabilitySet::none(),
            corpus: None,
            chaos_one_in: CHAOS_ONE_IN,
        }
    }

    /// A generator with default capabilities and the given seed.
    ///
    /// # Errors
    /// See [`GeneratorBuilder::build`].
    pub fn new(seed: u64) -> Result<Self> {
        Self::builder().seed(seed).build()
    }

    /// Produce one candidate program.
    ///
    /// The output is frequently syntactically invalid or semantically
    /// nonsensical; that is the point.
    pub fn generate_program(&mut self, depth_budget: i64) -> String {
        let mut gen = Gen::new(&mut self.rng, &self.tables).with_chaos_one_in(self.chaos_one_in);
        if let Some(corpus) = self.corpus.as_deref() {
            gen = gen.with_corpus(corpus);
        }
        let root = Bindings::from_names(&["x"]);
        let out = gen.make_script(depth_budget, &root);
        self.chaos_hits += gen.chaos_hits();
        out
    }

    /// Produce one fragment suitable for a nested-evaluation primitive
    /// (`eval`, sandbox eval, worker eval).
    pub fn generate_expression_for_eval(&mut self, depth_budget: i64, bindings: &Bindings) -> String {
        let mut gen = Gen::new(&mut self.rng, &self.tables).with_chaos_one_in(self.chaos_one_in);
        if let Some(corpus) = self.corpus.as_deref() {
            gen = gen.with_corpus(corpus);
        }
        let out = gen.make_script_for_eval(depth_budget, bindings);
        self.chaos_hits += gen.chaos_hits();
        out
    }

    /// Reset the PRNG to a fresh seed, replaying from the start.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SeededRng::from_seed(seed);
    }

    /// Checkpoint the PRNG state.
    #[must_use]
    pub fn rng_state(&self) -> RngState {
        self.rng.export_state()
    }

    /// Resume from a previously exported PRNG state.
    pub fn restore_rng_state(&mut self, state: &RngState) {
        self.rng.import_state(state);
    }

    /// PRNG draws consumed so far; (seed, draws) identifies a generation.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.rng.draws()
    }

    /// How many times the chaos dispatcher has fired.
    #[must_use]
    pub fn chaos_hits(&self) -> u64 {
        self.chaos_hits
    }

    /// The immutable grammar tables.
    #[must_use]
    pub fn tables(&self) -> &GrammarTables {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_program_returns_nonempty() {
        let mut gen = Generator::new(42).unwrap();
        let mut nonempty = 0;
        for _ in 0..20 {
            if !gen.generate_program(8).is_empty() {
                nonempty += 1;
            }
        }
        assert!(nonempty > 10);
    }

    #[test]
    fn test_same_seed_same_program() {
        let mut a = Generator::new(42).unwrap();
        let mut b = Generator::new(42).unwrap();
        for depth in [0, 3, 8, 14] {
            assert_eq!(a.generate_program(depth), b.generate_program(depth));
        }
    }

    #[test]
    fn test_reseed_replays() {
        let mut gen = Generator::new(42).unwrap();
        let first = gen.generate_program(3);
        gen.reseed(42);
        let second = gen.generate_program(3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_checkpoint_resume() {
        let mut gen = Generator::new(7).unwrap();
        gen.generate_program(5);
        let state = gen.rng_state();
        let next = gen.generate_program(5);
        gen.restore_rng_state(&state);
        assert_eq!(gen.generate_program(5), next);
    }

    #[test]
    fn test_eval_fragment_with_bindings() {
        let mut gen = Generator::new(11).unwrap();
        let b = Bindings::from_names(&["x", "y"]);
        for _ in 0..20 {
            let _ = gen.generate_expression_for_eval(6, &b);
        }
    }

    #[test]
    fn test_draws_monotonic() {
        let mut gen = Generator::new(3).unwrap();
        let before = gen.draws();
        gen.generate_program(5);
        assert!(gen.draws() > before);
    }

    #[test]
    fn test_builder_with_capabilities() {
        let gen = Generator::builder()
            .seed(1)
            .capabilities(CapabilitySet::spidermonkey_shell())
            .build()
            .unwrap();
        assert!(gen.tables().capabilities().sandbox_eval);
    }
}
