//! Per-task random number generators.
//!
//! Every worker task gets its own generator, seeded from the render seed and
//! the task's (pass, column, row) coordinates. Results are reproducible no
//! matter how rayon schedules the tasks.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Derives independent seeds for each render task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSource {
    base: u64,
}

impl SeedSource {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Seed for the task rendering macro pixel `(x, y)` during `pass`.
    pub fn seed(&self, pass: u32, x: u32, y: u32) -> u64 {
        let mut h = splitmix64(self.base);
        h = splitmix64(h ^ pass as u64);
        h = splitmix64(h ^ x as u64);
        splitmix64(h ^ ((y as u64) << 32))
    }
}

// SplitMix64 finalizer
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Builds the generator each render task draws from.
pub trait RngFactory: Send + Sync {
    type Rng: RngCore;

    fn rng(&self, seed: u64) -> Self::Rng;
}

/// Default factory: one `StdRng` per task.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdRngFactory;

impl RngFactory for StdRngFactory {
    type Rng = StdRng;

    fn rng(&self, seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }
}
