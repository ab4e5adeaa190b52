//! Seeded draws for fault decisions.
//!
//! Every fault decision is a draw from one Xoshiro256** stream, so a seed
//! fully determines which requests of a run fail and how.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Reproducible source of fault decisions.
///
/// ```rust
/// use sop_sim::SimRng;
///
/// let mut a = SimRng::new(12345);
/// let mut b = SimRng::new(12345);
/// let statuses = [500u16, 502, 503];
/// assert_eq!(a.pick(&statuses), b.pick(&statuses));
/// assert_eq!(a.draws(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SimRng {
    seed: u64,
    rng: Xoshiro256StarStar,
    draws: u64,
}

impl SimRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            draws: 0,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draws taken since creation or the last restart.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// True with probability `p`, clamped to `[0, 1]`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.draws += 1;
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Uniformly chosen element; `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, options: &'a [T]) -> Option<&'a T> {
        self.draws += 1;
        options.choose(&mut self.rng)
    }

    /// Rewind to the start of the seed's stream.
    pub fn restart(&mut self) {
        *self = Self::new(self.seed);
    }
}
