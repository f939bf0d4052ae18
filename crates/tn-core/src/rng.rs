//! Deterministic run-level RNG wrapper.
//!
//! The pipeline's only random consumer is the connectivity analyzer's
//! shortest-path smoke samples.  The wrapper exists so the seed flows from
//! `PipelineConfig` and no stage ever touches an OS entropy source — the
//! same seed always produces identical sample pairs.

use rand::rngs::SmallRng;
use rand::SeedableRng;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seeded RNG for one run.
pub struct RunRng(SmallRng);

impl RunRng {
    pub fn new(seed: u64) -> Self {
        RunRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive an independent child RNG — used when a stage needs its own
    /// stream without disturbing the parent's sequence.
    pub fn child(&mut self, offset: u64) -> RunRng {
        let child_seed = self.gen_range(0..u64::MAX) ^ offset.wrapping_mul(MIXING_CONSTANT);
        RunRng(SmallRng::seed_from_u64(child_seed))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        use rand::Rng;
        self.0.gen_range(range)
    }

    /// Choose a random element from a slice; `None` if empty.
    #[inline]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.0)
    }
}
