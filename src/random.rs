//! Randomness - Injected random stream for every stochastic decision
//!
//! The hardware never owns a generator. Each tick borrows one through the
//! execution context so that a fixed seed and a fixed tick order replay a
//! run draw for draw.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Random draws consumed by the hardware
pub trait Randomness {
    /// True with probability `prob`. Probabilities ≤ 0 or ≥ 1 draw nothing.
    fn p(&mut self, prob: f64) -> bool;

    /// Uniform integer in `[0, range)`; 0 when `range` is 0.
    fn uniform_int(&mut self, range: usize) -> usize;

    /// Uniform real in `[0, max)`
    fn uniform_f64(&mut self, max: f64) -> f64;
}

impl<R: Rng + ?Sized> Randomness for R {
    fn p(&mut self, prob: f64) -> bool {
        if prob <= 0.0 {
            return false;
        }
        if prob >= 1.0 {
            return true;
        }
        self.gen::<f64>() < prob
    }

    fn uniform_int(&mut self, range: usize) -> usize {
        if range == 0 {
            return 0;
        }
        self.gen_range(0..range)
    }

    fn uniform_f64(&mut self, max: f64) -> f64 {
        if max <= 0.0 {
            return 0.0;
        }
        self.gen::<f64>() * max
    }
}

/// Deterministic generator for reproducible runs
pub fn seeded(seed: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(seed)
}
