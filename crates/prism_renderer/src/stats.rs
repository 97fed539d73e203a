//! Render statistics shared by all worker threads.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters updated concurrently while a render runs.
///
/// One instance per render invocation; counters only grow.
#[derive(Debug)]
pub struct RaytracingStats {
    rays: AtomicU64,
    max_depth: AtomicU32,
    started: Instant,
}

impl RaytracingStats {
    pub fn new() -> Self {
        Self {
            rays: AtomicU64::new(0),
            max_depth: AtomicU32::new(0),
            started: Instant::now(),
        }
    }

    /// Count one traced ray at recursion `level` (1 for camera rays).
    #[inline]
    pub fn record_ray(&self, level: u32) {
        self.rays.fetch_add(1, Ordering::Relaxed);
        self.max_depth.fetch_max(level, Ordering::Relaxed);
    }

    pub fn rays(&self) -> u64 {
        self.rays.load(Ordering::Relaxed)
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rays: self.rays(),
            max_depth: self.max_depth(),
            elapsed: self.elapsed(),
        }
    }
}

impl Default for RaytracingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of [`RaytracingStats`] handed to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub rays: u64,
    pub max_depth: u32,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    /// Rays per second over the elapsed time.
    pub fn rays_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rays as f64 / secs
        } else {
            0.0
        }
    }
}
