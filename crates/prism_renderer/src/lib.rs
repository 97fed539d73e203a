//! Prism Renderer - CPU path tracing.
//!
//! A Monte Carlo path tracer over a [`prism_core::Scene`]. Scanlines are
//! rendered in order with their pixels spread across the rayon pool; every
//! finished scanline is reported to a [`ProgressSink`] and the render can be
//! stopped between scanlines with a [`CancellationToken`].

mod driver;
mod integrator;
mod params;
mod progress;
mod seed;
mod stats;

pub use driver::{RenderResult, RenderState, Renderer};
pub use integrator::{gamma_correct, linear_to_gamma, pixel_to_rgba, trace_ray};
pub use params::{RenderError, RenderParameters};
pub use progress::{CancellationToken, NoProgress, ProgressSink, RenderProgress};
pub use seed::{RngFactory, SeedSource, StdRngFactory};
pub use stats::{RaytracingStats, StatsSnapshot};
