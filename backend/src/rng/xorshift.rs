//! xorshift64* random number generator
//!
//! A fast, high-quality PRNG that is deterministic and suitable for
//! simulation purposes. Same seed → same sequence, which is what makes
//! world generation and whole simulation runs replayable.
//!
//! On top of the raw generator this adds the sampling helpers the postal
//! simulation needs: uniform floats, Bernoulli trials, Box–Muller normal
//! draws (population sizes), slice picks and Fisher–Yates shuffles.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use postal_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let range_value = rng.range(0, 100); // [0, 100)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with the given seed.
    ///
    /// A zero seed is remapped to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate the next random u64 value, advancing the internal state.
    pub fn next(&mut self) -> u64 {
        // xorshift64* algorithm
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate a random value in `[min, max)`.
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Generate a random f64 in `[0.0, 1.0)`.
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // Convert to [0.0, 1.0) using the top 53 bits
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Generate a random f64 in `[lo, hi)`.
    ///
    /// # Panics
    /// Panics if `lo >= hi`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        assert!(lo < hi, "lo must be less than hi");
        lo + self.next_f64() * (hi - lo)
    }

    /// Bernoulli trial: returns true with probability `p`.
    ///
    /// `p <= 0.0` never fires, `p >= 1.0` always fires.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Sample from a normal distribution via the Box–Muller transform.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(f64::MIN_POSITIVE); // ln(0) guard
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Pick a random element of a non-empty slice.
    ///
    /// # Panics
    /// Panics if the slice is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "cannot pick from an empty slice");
        let idx = self.range(0, items.len() as i64) as usize;
        &items[idx]
    }

    /// Shuffle a slice in place (Fisher–Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        if items.len() < 2 {
            return;
        }
        for i in (1..items.len()).rev() {
            let j = self.range(0, (i + 1) as i64) as usize;
            items.swap(i, j);
        }
    }

    /// Get the current RNG state (for replay).
    pub fn get_state(&self) -> u64 {
        self.state
    }
}
