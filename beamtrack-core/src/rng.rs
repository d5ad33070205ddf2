//! Deterministic random source shared by every stochastic process.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::StandardNormal;

/// Seeded random number generator owned by the tracking run loop.
///
/// The handle wraps `StdRng` seeded from a single `u64`. Processes never
/// create their own generators; they borrow this one for the duration of a
/// step, so every draw happens in one deterministic sequence and a rerun with
/// the same seed reproduces the same losses and kicks.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new handle from a master seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[lo, hi)`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.rng.gen::<f64>()
    }

    /// Uniform draw in the open interval `(0, 1)`, safe to take a logarithm of.
    pub fn open01(&mut self) -> f64 {
        self.rng.sample(rand::distributions::Open01)
    }

    /// Standard normal draw.
    pub fn normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
