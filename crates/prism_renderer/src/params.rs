//! Render invocation parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the render driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Invalid render parameters: {0}")]
    InvalidParameters(String),
}

/// Settings for one render invocation.
///
/// Missing fields in serialized settings fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParameters {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel for anti-aliasing (>= 1)
    pub samples_per_pixel: u32,
    /// Side of the square pixel block traced as one sample (>= 1)
    pub resolution_reduction: u32,
    /// Maximum ray bounce depth
    pub max_depth: u32,
    /// Refine the whole image one sample per pass instead of finishing each pixel
    pub progressive: bool,
    /// Base seed for every per-task generator
    pub seed: u64,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            samples_per_pixel: 16,
            resolution_reduction: 1,
            max_depth: 50,
            progressive: false,
            seed: 0,
        }
    }
}

impl RenderParameters {
    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set quality settings.
    pub fn with_quality(mut self, samples_per_pixel: u32, max_depth: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self.max_depth = max_depth;
        self
    }

    pub fn with_resolution_reduction(mut self, factor: u32) -> Self {
        self.resolution_reduction = factor;
        self
    }

    pub fn with_progressive(mut self, progressive: bool) -> Self {
        self.progressive = progressive;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidParameters(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidParameters(
                "samples_per_pixel must be at least 1".to_string(),
            ));
        }
        if self.resolution_reduction == 0 {
            return Err(RenderError::InvalidParameters(
                "resolution_reduction must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Width and height in macro pixels after resolution reduction.
    pub fn reduced_size(&self) -> (u32, u32) {
        let r = self.resolution_reduction.max(1);
        (self.width.div_ceil(r), self.height.div_ceil(r))
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RenderParameters::default().validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let zero_spp = RenderParameters::default().with_quality(0, 10);
        assert!(matches!(zero_spp.validate(), Err(RenderError::InvalidParameters(_))));

        let zero_reduction = RenderParameters::default().with_resolution_reduction(0);
        assert!(zero_reduction.validate().is_err());

        let empty = RenderParameters::default().with_resolution(0, 10);
        assert!(empty.validate().is_err());

        // Depth zero is allowed and renders black
        let no_bounces = RenderParameters::default().with_quality(1, 0);
        assert!(no_bounces.validate().is_ok());
    }

    #[test]
    fn test_reduced_size_rounds_up() {
        let params = RenderParameters::default()
            .with_resolution(10, 7)
            .with_resolution_reduction(4);
        assert_eq!(params.reduced_size(), (3, 2));
    }

    #[test]
    fn test_json_roundtrip_with_partial_input() {
        let params: RenderParameters =
            serde_json::from_str(r#"{ "width": 64, "height": 32, "progressive": true }"#).unwrap();
        assert_eq!(params.width, 64);
        assert_eq!(params.height, 32);
        assert!(params.progressive);
        assert_eq!(params.samples_per_pixel, RenderParameters::default().samples_per_pixel);

        let json = serde_json::to_string(&params).unwrap();
        let back: RenderParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
