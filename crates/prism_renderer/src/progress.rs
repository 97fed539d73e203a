//! Progress reporting and cooperative cancellation.

use prism_math::Vec4;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::stats::StatsSnapshot;

/// One finished scanline of one pass.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Zero-based pass index; always 0 for non-progressive renders
    pub pass: u32,
    pub passes: u32,
    /// First image row covered by this scanline
    pub scanline: u32,
    /// Image rows covered (the reduction factor, clipped at the bottom edge)
    pub rows: u32,
    pub width: u32,
    /// Gamma-corrected pixels, `rows * width`, row-major
    pub pixels: Vec<Vec4>,
    /// Cumulative completion in `[0, 100]`
    pub completion: f32,
    pub stats: StatsSnapshot,
}

impl RenderProgress {
    /// Pixels of one image row inside this scanline.
    pub fn row(&self, index: u32) -> Option<&[Vec4]> {
        if index >= self.rows {
            return None;
        }
        let start = index as usize * self.width as usize;
        self.pixels.get(start..start + self.width as usize)
    }
}

/// Receiver of progress events, called from the rendering thread in scanline order.
pub trait ProgressSink {
    fn report(&mut self, progress: RenderProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(RenderProgress),
{
    fn report(&mut self, progress: RenderProgress) {
        self(progress)
    }
}

impl ProgressSink for Sender<RenderProgress> {
    fn report(&mut self, progress: RenderProgress) {
        // A dropped receiver just stops listening
        if self.send(progress).is_err() {
            log::trace!("Progress receiver disconnected");
        }
    }
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: RenderProgress) {}
}

/// Shared flag requesting that a render stop at the next scanline.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear a previous request so the token can drive another render.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
