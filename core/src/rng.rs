//! Deterministic random number generation for the anomaly model.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through ModelRng instances derived from the
//! seed in AnomalyConfig.
//!
//! Each isolation tree gets its own stream, seeded deterministically
//! from (seed XOR tree_index * golden ratio). This means:
//!   - Changing the tree count never changes existing trees' streams.
//!   - Two fits with the same seed on the same data are identical.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG stream for a single model component.
pub struct ModelRng {
    inner: Pcg64Mcg,
}

impl ModelRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Derive the stream for one stable component index.
    pub fn for_stream(seed: u64, index: u64) -> Self {
        Self::new(seed ^ index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll an index in [0, n).
    pub fn next_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "n must be > 0");
        (self.inner.next_u64() % n as u64) as usize
    }

    /// Uniform float in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Draw `k` distinct indices from [0, n) (partial Fisher-Yates).
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.next_index(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}
