//! The pseudo-random generator the skip list treats as an external collaborator.
//!
//! The skip list only ever needs a fair `p = 0.5` coin per level, so the
//! collaborator is expressed as a small trait rather than a concrete type,
//! letting callers substitute their own source. Two implementations ship here:
//! [`Lcg`], a direct port of the reference generator (deterministic, seedable,
//! useful for reproducible tests and benchmarks), and [`ThreadRng`], which
//! defers to the `rand` crate's thread-local generator for everyday use.

use rand::RngCore;

/// An external source of uniform 32-bit values, as consulted by the skip list's
/// probabilistic level assignment.
pub trait RandomSource {
    /// Returns a uniformly distributed 32-bit value.
    fn next_u32(&mut self) -> u32;
}

/// The upper bound the reference generator's output is masked into; the skip
/// list treats `next_u32() < RAND_MAX / 2` as a fair coin flip.
pub const RAND_MAX: u32 = 0x7FFF_FFFF;

/// A direct port of the reference linear congruential generator.
///
/// `seed <- (314159269 * seed + 453806245) & RAND_MAX`. Deterministic and cheap,
/// primarily useful for reproducible tests and benchmarks where a fixed level
/// distribution is wanted across runs.
#[derive(Debug, Clone, Copy)]
pub struct Lcg {
    seed: u32,
}

impl Lcg {
    /// Creates a generator seeded with `seed`.
    pub fn new(seed: u32) -> Self {
        Lcg { seed }
    }

    /// Advances the seed by `delta`, matching the reference `set_seed`'s
    /// additive (not replacing) semantics.
    pub fn set_seed(&mut self, delta: u32) {
        self.seed = self.seed.wrapping_add(delta);
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Lcg::new(0)
    }
}

impl RandomSource for Lcg {
    fn next_u32(&mut self) -> u32 {
        self.seed = (314159269u32.wrapping_mul(self.seed)).wrapping_add(453806245) & RAND_MAX;
        self.seed
    }
}

/// Wraps `rand`'s thread-local generator. The default [`RandomSource`] used by
/// [`crate::skiplist::SkipList`] and [`crate::hashmap::HybridMap`] when none is
/// supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRng;

impl RandomSource for ThreadRng {
    fn next_u32(&mut self) -> u32 {
        rand::thread_rng().next_u32() & RAND_MAX
    }
}
