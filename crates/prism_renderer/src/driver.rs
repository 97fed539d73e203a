//! Render driver: schedules camera rays over the image and reports progress.
//!
//! Scanlines run one after another; the macro pixels of a scanline are fanned
//! out over the rayon pool. Between scanlines the driver publishes the finished
//! row and checks the cancellation token.

use prism_core::sampling::gen_f32;
use prism_core::{Camera, CameraRays, Color, Scene};
use prism_math::Vec4;
use rayon::prelude::*;

use crate::integrator::{gamma_correct, pixel_to_rgba, sanitize, trace_ray};
use crate::params::{RenderError, RenderParameters};
use crate::progress::{CancellationToken, ProgressSink, RenderProgress};
use crate::seed::{RngFactory, SeedSource, StdRngFactory};
use crate::stats::{RaytracingStats, StatsSnapshot};

/// Lifecycle of a [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Rendering,
    Completed,
    Cancelled,
}

/// Final image of one render invocation.
#[derive(Debug, Clone)]
pub struct RenderResult {
    pub width: u32,
    pub height: u32,
    /// Gamma-corrected RGBA, row-major, top row first
    pub pixels: Vec<Vec4>,
    pub stats: StatsSnapshot,
    pub cancelled: bool,
    /// Completion in `[0, 100]`; below 100 when cancelled
    pub completion: f32,
}

impl RenderResult {
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(pixel_index(x, y, self.width)).copied()
    }

    /// Pack the image as 8-bit RGBA bytes.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|&p| pixel_to_rgba(p)).collect()
    }
}

/// Drives render invocations.
///
/// `F` builds the per-task random generators; tests swap in deterministic ones.
#[derive(Debug, Default)]
pub struct Renderer<F = StdRngFactory> {
    factory: F,
    state: RenderState,
}

impl Renderer<StdRngFactory> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: RngFactory> Renderer<F> {
    pub fn with_rng_factory(factory: F) -> Self {
        Self {
            factory,
            state: RenderState::Idle,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Render `scene` through `camera`.
    ///
    /// The camera's aspect ratio is set from the output size. Progress is
    /// reported to `sink` after every scanline of every pass, in order.
    /// Cancellation is checked before each scanline and yields a result with
    /// `cancelled` set and the pixels finished so far.
    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &mut Camera,
        params: &RenderParameters,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<RenderResult, RenderError> {
        params.validate()?;
        self.state = RenderState::Rendering;

        camera.set_aspect(params.aspect());
        let rays = camera.rays();
        let stats = RaytracingStats::new();
        let tracer = Tracer {
            scene,
            rays,
            factory: &self.factory,
            seeds: SeedSource::new(params.seed),
            stats: &stats,
            params,
        };

        let (width, height) = (params.width, params.height);
        let reduction = params.resolution_reduction;
        let (cols, rows) = params.reduced_size();
        let passes = tracer.passes();
        let total_steps = passes as u64 * rows as u64;

        log::info!(
            "Rendering '{}': {}x{}, {} spp, depth {}, reduction {}, {}",
            scene.name,
            width,
            height,
            params.samples_per_pixel,
            params.max_depth,
            reduction,
            if params.progressive { "progressive" } else { "single pass" }
        );

        let mut accumulator = vec![Color::ZERO; pixel_index(0, rows, cols)];
        let mut pixels = vec![Vec4::W; pixel_index(0, height, width)];
        let mut completed_steps = 0u64;
        let mut cancelled = false;

        'passes: for pass in 0..passes {
            let samples_so_far = (pass + 1) as f32 * tracer.samples_per_task() as f32;

            for row in 0..rows {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'passes;
                }

                let samples: Vec<Color> = (0..cols)
                    .into_par_iter()
                    .map(|col| tracer.sample(pass, col, row))
                    .collect();

                let line_start = pixel_index(0, row, cols);
                let line = &mut accumulator[line_start..line_start + cols as usize];
                for (sum, sample) in line.iter_mut().zip(samples) {
                    *sum += sample;
                }

                // One image row, each macro pixel repeated across its block
                let image_row: Vec<Vec4> = (0..width)
                    .map(|x| gamma_correct(line[(x / reduction) as usize] / samples_so_far))
                    .collect();

                let y0 = row * reduction;
                let block_rows = reduction.min(height - y0);
                let mut scanline = Vec::with_capacity(pixel_index(0, block_rows, width));
                for y in y0..y0 + block_rows {
                    let start = pixel_index(0, y, width);
                    pixels[start..start + width as usize].copy_from_slice(&image_row);
                    scanline.extend_from_slice(&image_row);
                }

                completed_steps += 1;
                sink.report(RenderProgress {
                    pass,
                    passes,
                    scanline: y0,
                    rows: block_rows,
                    width,
                    pixels: scanline,
                    completion: completion(completed_steps, total_steps),
                    stats: stats.snapshot(),
                });
            }

            log::debug!(
                "Pass {}/{} finished, {} rays so far",
                pass + 1,
                passes,
                stats.rays()
            );
        }

        let snapshot = stats.snapshot();
        let result = RenderResult {
            width,
            height,
            pixels,
            stats: snapshot,
            cancelled,
            completion: completion(completed_steps, total_steps),
        };

        if cancelled {
            self.state = RenderState::Cancelled;
            log::info!(
                "Render cancelled at {:.1}% after {:.2}s",
                result.completion,
                snapshot.elapsed.as_secs_f64()
            );
        } else {
            self.state = RenderState::Completed;
            log::info!(
                "Render finished: {} rays, max depth {}, {:.2}s ({:.0} rays/s)",
                snapshot.rays,
                snapshot.max_depth,
                snapshot.elapsed.as_secs_f64(),
                snapshot.rays_per_second()
            );
        }

        Ok(result)
    }
}

/// Row-major index of (`x`, `y`), computed in `usize` so large images don't wrap.
#[inline]
fn pixel_index(x: u32, y: u32, width: u32) -> usize {
    y as usize * width as usize + x as usize
}

fn completion(done: u64, total: u64) -> f32 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0) as f32
}

/// Read-only state shared by every task of one render.
pub(crate) struct Tracer<'a, F> {
    pub(crate) scene: &'a Scene,
    pub(crate) rays: CameraRays,
    pub(crate) factory: &'a F,
    pub(crate) seeds: SeedSource,
    pub(crate) stats: &'a RaytracingStats,
    pub(crate) params: &'a RenderParameters,
}

impl<F: RngFactory> Tracer<'_, F> {
    pub(crate) fn passes(&self) -> u32 {
        if self.params.progressive {
            self.params.samples_per_pixel
        } else {
            1
        }
    }

    pub(crate) fn samples_per_task(&self) -> u32 {
        if self.params.progressive {
            1
        } else {
            self.params.samples_per_pixel
        }
    }

    /// Sum of this task's samples for macro pixel (`col`, `row`) in `pass`.
    ///
    /// Each sample is jittered over the image pixels the macro pixel covers.
    pub(crate) fn sample(&self, pass: u32, col: u32, row: u32) -> Color {
        let params = self.params;
        let reduction = params.resolution_reduction;
        let x0 = col * reduction;
        let y0 = row * reduction;
        let block_w = reduction.min(params.width - x0) as f32;
        let block_h = reduction.min(params.height - y0) as f32;

        let mut rng = self.factory.rng(self.seeds.seed(pass, col, row));
        let mut sum = Color::ZERO;
        for _ in 0..self.samples_per_task() {
            let x = x0 as f32 + gen_f32(&mut rng) * block_w;
            let y = y0 as f32 + gen_f32(&mut rng) * block_h;
            let ray = self
                .rays
                .ray_through_pixel(x, y, params.width, params.height, &mut rng);
            sum += sanitize(trace_ray(
                &ray,
                self.scene,
                params.max_depth,
                self.stats,
                &mut rng,
            ));
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{Entity, Environment, Geometry, Material, Sphere, Transform};
    use prism_math::{Aabb, Vec3};
    use rand::RngCore;
    use std::sync::Arc;

    fn empty_scene(environment: Environment) -> Scene {
        Scene::new("empty", Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0)))
            .with_environment(environment)
    }

    fn ball_scene() -> Scene {
        let mut scene = empty_scene(Environment::sky());
        let id = scene.transforms_mut().insert(Transform::default());
        scene
            .add(Entity::new(
                "ball",
                id,
                Arc::new(Geometry::from(Sphere::new(Vec3::ZERO, 1.5))),
                Arc::new(Material::diffuse(Color::new(0.8, 0.4, 0.2))),
            ))
            .unwrap();
        scene.finalize_octree();
        scene
    }

    fn camera() -> Camera {
        Camera::looking_at(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, 45.0, 1.0)
    }

    /// Replays a fixed table of values, starting at an offset picked by the seed.
    struct TableRng {
        index: usize,
    }

    const TABLE: [u32; 7] = [
        0x1000_0000,
        0xF000_0000,
        0x8000_0000,
        0x4000_0000,
        0xC000_0000,
        0x2000_0000,
        0xA000_0000,
    ];

    impl RngCore for TableRng {
        fn next_u32(&mut self) -> u32 {
            let value = TABLE[self.index % TABLE.len()];
            self.index += 1;
            value
        }

        fn next_u64(&mut self) -> u64 {
            ((self.next_u32() as u64) << 32) | self.next_u32() as u64
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            for chunk in dest.chunks_mut(4) {
                let bytes = self.next_u32().to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    struct TableFactory;

    impl RngFactory for TableFactory {
        type Rng = TableRng;

        fn rng(&self, seed: u64) -> TableRng {
            TableRng {
                index: (seed % TABLE.len() as u64) as usize,
            }
        }
    }

    #[test]
    fn test_single_pass_solid_environment() {
        let scene = empty_scene(Environment::Solid(Color::splat(0.25)));
        let params = RenderParameters::default()
            .with_resolution(8, 6)
            .with_quality(4, 5);
        let mut renderer = Renderer::new();
        assert_eq!(renderer.state(), RenderState::Idle);

        let mut events = 0;
        let mut sink = |_: RenderProgress| events += 1;
        let result = renderer
            .render(&scene, &mut camera(), &params, &mut sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(renderer.state(), RenderState::Completed);
        assert!(!result.cancelled);
        assert_eq!(result.completion, 100.0);
        assert_eq!(result.pixels.len(), 48);
        for pixel in &result.pixels {
            assert!((*pixel - Vec4::new(0.5, 0.5, 0.5, 1.0)).length() < 1e-5);
        }
        // One camera ray per sample, no bounces on a miss
        assert_eq!(result.stats.rays, 8 * 6 * 4);
        assert_eq!(result.stats.max_depth, 1);
        assert_eq!(events, 6);
    }

    #[test]
    fn test_progressive_pass_is_running_mean() {
        let scene = ball_scene();
        let params = RenderParameters::default()
            .with_resolution(6, 6)
            .with_quality(3, 4)
            .with_progressive(true)
            .with_seed(11);
        let mut cam = camera();

        let mut events = Vec::new();
        let mut sink = |p: RenderProgress| events.push(p);
        let mut renderer = Renderer::with_rng_factory(TableFactory);
        let result = renderer
            .render(&scene, &mut cam, &params, &mut sink, &CancellationToken::new())
            .unwrap();
        assert_eq!(events.len(), 3 * 6);

        // Replay every pass independently and average by hand
        let stats = RaytracingStats::new();
        let tracer = Tracer {
            scene: &scene,
            rays: cam.rays(),
            factory: &TableFactory,
            seeds: SeedSource::new(11),
            stats: &stats,
            params: &params,
        };

        for event in &events {
            let k = event.pass + 1;
            for x in 0..6 {
                let mut sum = Color::ZERO;
                for pass in 0..k {
                    sum += tracer.sample(pass, x, event.scanline);
                }
                let expected = gamma_correct(sum / k as f32);
                let got = event.pixels[x as usize];
                assert!(
                    (got - expected).length() < 1e-5,
                    "pass {} pixel ({}, {}): {:?} != {:?}",
                    event.pass,
                    x,
                    event.scanline,
                    got,
                    expected
                );
            }
        }

        // The final image is the last pass
        let last = &events[events.len() - 1];
        assert_eq!(result.pixel(5, 5), Some(last.pixels[5]));
    }

    #[test]
    fn test_progressive_passes_refine() {
        let scene = ball_scene();
        let params = RenderParameters::default()
            .with_resolution(4, 4)
            .with_quality(2, 4)
            .with_progressive(true);

        let mut events = Vec::new();
        let mut sink = |p: RenderProgress| events.push((p.pass, p.scanline, p.completion));
        Renderer::new()
            .render(&scene, &mut camera(), &params, &mut sink, &CancellationToken::new())
            .unwrap();

        // Scanlines in order within each pass, completion strictly rising
        let order: Vec<(u32, u32)> = events.iter().map(|e| (e.0, e.1)).collect();
        assert_eq!(
            order,
            vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1), (1, 2), (1, 3)]
        );
        assert!(events.windows(2).all(|w| w[0].2 < w[1].2));
        assert_eq!(events[events.len() - 1].2, 100.0);
    }

    #[test]
    fn test_cancellation_mid_render() {
        let scene = ball_scene();
        let params = RenderParameters::default()
            .with_resolution(8, 8)
            .with_quality(1, 3);
        let cancel = CancellationToken::new();

        let mut reported = Vec::new();
        let token = cancel.clone();
        let mut sink = |p: RenderProgress| {
            reported.push(p.scanline);
            if p.scanline == 2 {
                token.cancel();
            }
        };
        let mut renderer = Renderer::new();
        let result = renderer
            .render(&scene, &mut camera(), &params, &mut sink, &cancel)
            .unwrap();

        assert!(result.cancelled);
        assert!(result.completion < 100.0);
        assert_eq!(reported, vec![0, 1, 2]);
        assert_eq!(renderer.state(), RenderState::Cancelled);
        // Unrendered rows stay opaque black
        assert_eq!(result.pixel(0, 7), Some(Vec4::W));
    }

    #[test]
    fn test_cancelled_before_start() {
        let scene = ball_scene();
        let params = RenderParameters::default().with_resolution(4, 4).with_quality(1, 2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut events = 0;
        let mut sink = |_: RenderProgress| events += 1;
        let result = Renderer::new()
            .render(&scene, &mut camera(), &params, &mut sink, &cancel)
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.completion, 0.0);
        assert_eq!(result.stats.rays, 0);
        assert_eq!(events, 0);
    }

    #[test]
    fn test_resolution_reduction_replicates_blocks() {
        let scene = ball_scene();
        let params = RenderParameters::default()
            .with_resolution(5, 3)
            .with_quality(2, 3)
            .with_resolution_reduction(2);

        let mut events = Vec::new();
        let mut sink = |p: RenderProgress| events.push(p);
        let result = Renderer::new()
            .render(&scene, &mut camera(), &params, &mut sink, &CancellationToken::new())
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!((events[0].scanline, events[0].rows), (0, 2));
        assert_eq!((events[1].scanline, events[1].rows), (2, 1));
        assert_eq!(events[0].pixels.len(), 10);
        assert_eq!(events[1].pixels.len(), 5);
        assert_eq!(events[0].row(0), events[0].row(1));

        // 3 x 2 macro pixels, two samples each
        assert_eq!(result.pixels.len(), 15);
        assert!(result.stats.rays >= 12);
        let block = result.pixel(0, 0);
        assert_eq!(result.pixel(1, 0), block);
        assert_eq!(result.pixel(0, 1), block);
        assert_eq!(result.pixel(1, 1), block);
        assert_eq!(result.pixel(3, 2), result.pixel(2, 2));
    }

    #[test]
    fn test_same_seed_same_image() {
        let scene = ball_scene();
        let params = RenderParameters::default()
            .with_resolution(6, 4)
            .with_quality(2, 4)
            .with_seed(5);

        let render = || {
            Renderer::new()
                .render(
                    &scene,
                    &mut camera(),
                    &params,
                    &mut crate::progress::NoProgress,
                    &CancellationToken::new(),
                )
                .unwrap()
                .pixels
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_invalid_parameters_leave_idle() {
        let scene = empty_scene(Environment::default());
        let params = RenderParameters::default().with_quality(0, 1);
        let mut renderer = Renderer::new();

        let result = renderer.render(
            &scene,
            &mut camera(),
            &params,
            &mut crate::progress::NoProgress,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(RenderError::InvalidParameters(_))));
        assert_eq!(renderer.state(), RenderState::Idle);
    }

    #[test]
    fn test_camera_aspect_follows_output() {
        let scene = empty_scene(Environment::default());
        let params = RenderParameters::default().with_resolution(20, 10).with_quality(1, 1);
        let mut cam = camera();
        Renderer::new()
            .render(
                &scene,
                &mut cam,
                &params,
                &mut crate::progress::NoProgress,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(cam.aspect(), 2.0);
    }

    #[test]
    fn test_pixel_index_does_not_wrap() {
        assert_eq!(pixel_index(3, 2, 10), 23);
        // 70000 * 70000 exceeds u32::MAX
        assert_eq!(pixel_index(0, 70_000, 70_000), 4_900_000_000usize);
        assert_eq!(
            pixel_index(u32::MAX, u32::MAX, u32::MAX),
            u32::MAX as usize * u32::MAX as usize + u32::MAX as usize
        );
    }

    #[test]
    fn test_to_rgba8() {
        let result = RenderResult {
            width: 2,
            height: 1,
            pixels: vec![Vec4::new(1.0, 0.0, 0.5, 1.0), Vec4::W],
            stats: StatsSnapshot::default(),
            cancelled: false,
            completion: 100.0,
        };
        assert_eq!(result.to_rgba8(), vec![255, 0, 127, 255, 0, 0, 0, 255]);
    }
}
