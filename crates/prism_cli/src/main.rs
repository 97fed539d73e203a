mod cli;
mod demo;

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use image::RgbaImage;
use prism_renderer::{CancellationToken, RenderProgress, Renderer};

use crate::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .init();

    log::info!("Starting Prism");

    let params = args.render_parameters()?;
    let (scene, mut camera) = demo::build_scene(args.mesh.as_deref())?;
    let time_limit = args.time_limit.map(Duration::from_secs_f64);

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel();

    let result = thread::scope(|s| {
        let scene = &scene;
        let camera = &mut camera;
        let params = &params;
        let token = &cancel;
        let worker = s.spawn(move || {
            let mut tx = tx;
            Renderer::new().render(scene, camera, params, &mut tx, token)
        });

        watch_progress(rx, &cancel, time_limit);
        worker.join()
    })
    .map_err(|_| anyhow!("Render thread panicked"))??;

    if result.cancelled {
        log::warn!("Render stopped at {:.1}%, saving partial image", result.completion);
    }

    let image = RgbaImage::from_raw(result.width, result.height, result.to_rgba8())
        .context("Pixel buffer does not match the image size")?;
    image
        .save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    log::info!(
        "Saved {} ({} rays in {:.2}s)",
        args.output.display(),
        result.stats.rays,
        result.stats.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Log progress until the render finishes, cancelling once `time_limit` passes.
fn watch_progress(rx: Receiver<RenderProgress>, cancel: &CancellationToken, time_limit: Option<Duration>) {
    let started = Instant::now();
    let mut next_report = 0.0;

    for progress in rx {
        if progress.completion >= next_report {
            log::info!(
                "Pass {}/{} scanline {}: {:.0}% ({:.0} rays/s)",
                progress.pass + 1,
                progress.passes,
                progress.scanline,
                progress.completion,
                progress.stats.rays_per_second()
            );
            next_report = progress.completion + 10.0;
        }

        if let Some(limit) = time_limit {
            if started.elapsed() >= limit && !cancel.is_cancelled() {
                log::info!("Time limit of {:.1}s reached, cancelling", limit.as_secs_f64());
                cancel.cancel();
            }
        }
    }
}
