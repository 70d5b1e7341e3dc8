//! Deterministic, replayable random source
//!
//! Every random decision the grammar makes flows through [`SeededRng`] so a
//! generation run can be reproduced byte-for-byte from a recorded seed, or
//! resumed mid-stream from an exported [`RngState`] checkpoint. The stream
//! is backed by `ChaCha8` because its position within the keystream can be
//! captured and restored cheaply.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Exported PRNG state: seed material plus stream position.
///
/// Importing a state reproduces the draw sequence exactly from the captured
/// point. Together with [`SeededRng::draws`] this is the reproducibility
/// contract: a failing generation is identified by (seed, draw count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngState {
    seed: [u8; 32],
    word_pos: u128,
    draws: u64,
}

/// Seedable, checkpointable random source for grammar decisions.
#[derive(Debug, Clone)]
pub struct SeededRng {
    rng: ChaCha8Rng,
    draws: u64,
}

impl SeededRng {
    /// Create a fresh source from an integer seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            draws: 0,
        }
    }

    /// Uniform integer in `[0, n)`. Returns 0 when `n == 0`.
    ///
    /// This is the workhorse: nearly every production decision is phrased
    /// as `next(n)` compared against a small constant.
    pub fn next(&mut self, n: u64) -> u64 {
        self.draws += 1;
        if n == 0 {
            return 0;
        }
        self.rng.gen_range(0..n)
    }

    /// True roughly `1/n` of the time (`next(n) == 0`).
    pub fn one_in(&mut self, n: u64) -> bool {
        self.next(n) == 0
    }

    /// Uniform float in `[0, 1)`.
    pub fn float(&mut self) -> f64 {
        self.draws += 1;
        self.rng.gen::<f64>()
    }

    /// Uniform choice from a slice.
    ///
    /// # Panics
    /// Panics on an empty slice; grammar pools are nonempty by construction.
    pub fn index<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let i = self.next(items.len() as u64) as usize;
        &items[i]
    }

    /// Random-size random subset, preserving the original relative order.
    pub fn subset<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut picked = Vec::new();
        for item in items {
            if self.next(2) == 0 {
                picked.push(item.clone());
            }
        }
        picked
    }

    /// Float in `[1, limit)` heavily skewed toward small values with rare
    /// large outliers. Used for repeat counts and stress parameters where
    /// "usually tiny, occasionally huge" is the interesting shape.
    pub fn skewed(&mut self, limit: f64) -> f64 {
        (self.float() * limit.ln()).exp()
    }

    /// Number of draws consumed so far.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Capture the current state for later replay.
    #[must_use]
    pub fn export_state(&self) -> RngState {
        RngState {
            seed: self.rng.get_seed(),
            word_pos: self.rng.get_word_pos(),
            draws: self.draws,
        }
    }

    /// Restore a previously exported state.
    pub fn import_state(&mut self, state: &RngState) {
        let mut rng = ChaCha8Rng::from_seed(state.seed);
        rng.set_word_pos(state.word_pos);
        self.rng = rng;
        self.draws = state.draws;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = SeededRng::from_seed(42);
        let mut b = SeededRng::from_seed(42);
        for _ in 0..1000 {
            assert_eq!(a.next(1000), b.next(1000));
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SeededRng::from_seed(1);
        let mut b = SeededRng::from_seed(2);
        let sa: Vec<u64> = (0..32).map(|_| a.next(1 << 30)).collect();
        let sb: Vec<u64> = (0..32).map(|_| b.next(1 << 30)).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_next_zero_is_zero() {
        let mut rng = SeededRng::from_seed(7);
        assert_eq!(rng.next(0), 0);
    }

    #[test]
    fn test_next_in_range() {
        let mut rng = SeededRng::from_seed(7);
        for _ in 0..10_000 {
            assert!(rng.next(13) < 13);
        }
    }

    #[test]
    fn test_export_import_resumes_stream() {
        let mut rng = SeededRng::from_seed(99);
        for _ in 0..57 {
            rng.next(1000);
        }
        let state = rng.export_state();
        let tail: Vec<u64> = (0..100).map(|_| rng.next(1000)).collect();

        let mut resumed = SeededRng::from_seed(0);
        resumed.import_state(&state);
        let tail2: Vec<u64> = (0..100).map(|_| resumed.next(1000)).collect();
        assert_eq!(tail, tail2);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut rng = SeededRng::from_seed(5);
        rng.next(10);
        let state = rng.export_state();
        let json = serde_json::to_string(&state).unwrap();
        let back: RngState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }

    #[test]
    fn test_draws_counts_every_draw() {
        let mut rng = SeededRng::from_seed(1);
        rng.next(5);
        rng.float();
        rng.one_in(3);
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_subset_preserves_order() {
        let mut rng = SeededRng::from_seed(3);
        let items: Vec<u32> = (0..64).collect();
        for _ in 0..50 {
            let sub = rng.subset(&items);
            let mut sorted = sub.clone();
            sorted.sort_unstable();
            assert_eq!(sub, sorted);
        }
    }

    #[test]
    fn test_skewed_bounds_and_bias() {
        let mut rng = SeededRng::from_seed(11);
        let mut small = 0usize;
        for _ in 0..10_000 {
            let v = rng.skewed(10_000.0);
            assert!((1.0..10_000.0).contains(&v));
            if v < 100.0 {
                small += 1;
            }
        }
        // log-uniform: half the mass sits below sqrt(10_000) = 100
        assert!(small > 3500, "expected small-value bias, got {small}/10000");
    }
}
