//! Background radiance for rays that leave the scene.

use std::sync::Arc;

use prism_math::Vec3;

use crate::material::Color;
use crate::texture::Cubemap;

/// Directional background color.
#[derive(Debug, Clone)]
pub enum Environment {
    Solid(Color),
    /// Linear blend from `horizon` (straight down) to `zenith` (straight up).
    Gradient { horizon: Color, zenith: Color },
    Cubemap(Arc<Cubemap>),
}

impl Environment {
    /// White to light blue sky.
    pub fn sky() -> Self {
        Environment::Gradient {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }

    /// Radiance arriving from `direction`.
    pub fn sample(&self, direction: Vec3) -> Color {
        match self {
            Environment::Solid(color) => *color,
            Environment::Gradient { horizon, zenith } => {
                let unit_direction = direction.normalize_or_zero();
                let a = 0.5 * (unit_direction.y + 1.0);
                *horizon * (1.0 - a) + *zenith * a
            }
            Environment::Cubemap(cubemap) => cubemap.sample(direction),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Solid(Color::ZERO)
    }
}
