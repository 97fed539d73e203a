use crate::{Interval, Vec3};

/// Smallest accepted hit distance for secondary rays, avoids self-intersection.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray in 3D space with origin, normalized direction and a valid parameter window.
///
/// The componentwise inverse of the direction is computed once here so that
/// every slab test along the ray can reuse it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub inv_direction: Vec3,
    pub window: Interval,
}

impl Ray {
    /// Create a ray valid over `[RAY_EPSILON, inf)`.
    ///
    /// The direction is normalized. A zero-length direction stays zero and
    /// every intersection routine treats such a ray as a miss.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::with_window(origin, direction, Interval::new(RAY_EPSILON, f32::INFINITY))
    }

    /// Create a ray with an explicit `[t_min, t_max]` window.
    pub fn with_window(origin: Vec3, direction: Vec3, window: Interval) -> Self {
        let direction = direction.normalize_or_zero();
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
            window,
        }
    }

    #[inline]
    pub fn t_min(&self) -> f32 {
        self.window.min
    }

    #[inline]
    pub fn t_max(&self) -> f32 {
        self.window.max
    }

    /// True if the direction is degenerate (zero or non-finite).
    pub fn is_degenerate(&self) -> bool {
        self.direction == Vec3::ZERO || !self.direction.is_finite()
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
