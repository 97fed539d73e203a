use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use prism_renderer::RenderParameters;

/// Log levels accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(about = "Render the Prism demo scene with the CPU path tracer")]
pub struct Args {
    /// Render settings file (JSON); flags override its values
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Samples per pixel
    #[arg(long, short = 's')]
    pub spp: Option<u32>,

    /// Maximum bounce depth
    #[arg(long)]
    pub depth: Option<u32>,

    /// Trace one sample per NxN pixel block
    #[arg(long)]
    pub reduction: Option<u32>,

    /// Seed for the per-pixel generators
    #[arg(long)]
    pub seed: Option<u64>,

    /// Refine the image one sample per pass
    #[arg(long)]
    pub progressive: bool,

    /// Extra OBJ mesh placed in the demo scene
    #[arg(long)]
    pub mesh: Option<PathBuf>,

    /// Stop rendering after this many seconds and keep the partial image
    #[arg(long)]
    pub time_limit: Option<f64>,

    /// Output PNG path
    #[arg(short, long, default_value = "render.png")]
    pub output: PathBuf,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl Args {
    /// Settings from `--settings` (or defaults) with command line overrides applied.
    pub fn render_parameters(&self) -> Result<RenderParameters> {
        let mut params = match &self.settings {
            Some(path) => load_settings(path)?,
            None => RenderParameters::default(),
        };

        if let Some(width) = self.width {
            params.width = width;
        }
        if let Some(height) = self.height {
            params.height = height;
        }
        if let Some(spp) = self.spp {
            params.samples_per_pixel = spp;
        }
        if let Some(depth) = self.depth {
            params.max_depth = depth;
        }
        if let Some(reduction) = self.reduction {
            params.resolution_reduction = reduction;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        if self.progressive {
            params.progressive = true;
        }

        params.validate()?;
        Ok(params)
    }
}

fn load_settings(path: &Path) -> Result<RenderParameters> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["prism"]);
        assert_eq!(args.render_parameters().unwrap(), RenderParameters::default());
        assert_eq!(args.output, PathBuf::from("render.png"));
    }

    #[test]
    fn test_flag_overrides() {
        let args = Args::parse_from([
            "prism",
            "--width",
            "320",
            "--height",
            "200",
            "-s",
            "4",
            "--reduction",
            "2",
            "--progressive",
            "--log-level",
            "debug",
        ]);
        let params = args.render_parameters().unwrap();
        assert_eq!((params.width, params.height), (320, 200));
        assert_eq!(params.samples_per_pixel, 4);
        assert_eq!(params.resolution_reduction, 2);
        assert!(params.progressive);
        assert_eq!(LevelFilter::from(args.log_level), LevelFilter::Debug);
    }

    #[test]
    fn test_settings_file_with_override() {
        let path = std::env::temp_dir().join(format!("prism_settings_{}.json", std::process::id()));
        fs::write(&path, r#"{ "width": 64, "height": 48, "max_depth": 7 }"#).unwrap();

        let args = Args::parse_from([
            "prism".to_string(),
            "--settings".to_string(),
            path.display().to_string(),
            "--height".to_string(),
            "32".to_string(),
        ]);
        let params = args.render_parameters().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(params.width, 64);
        assert_eq!(params.height, 32);
        assert_eq!(params.max_depth, 7);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::parse_from(["prism", "--spp", "0"]);
        assert!(args.render_parameters().is_err());
    }

    #[test]
    fn test_missing_settings_file() {
        let args = Args::parse_from(["prism", "--settings", "/nonexistent/prism.json"]);
        let err = args.render_parameters().unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }
}
