//! Ray intersection records.

use prism_math::{Vec2, Vec3};

/// Which side of a surface the ray arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The ray hit the outward-facing side.
    Outside,
    /// The ray started inside the surface and hit it on the way out.
    Inside,
}

/// Geometric result of a ray/surface intersection.
///
/// `normal` is the outward unit surface normal regardless of [`Side`];
/// materials flip it when the ray is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// Ray parameter of the hit. Equals the world distance for unit directions.
    pub distance: f32,
    pub side: Side,
}

impl SurfaceHit {
    /// Normal oriented against the incoming ray.
    pub fn facing_normal(&self) -> Vec3 {
        match self.side {
            Side::Outside => self.normal,
            Side::Inside => -self.normal,
        }
    }
}

/// A surface hit together with the object that was hit.
#[derive(Debug)]
pub struct RayHit<'a, T: ?Sized> {
    pub surface: SurfaceHit,
    pub object: &'a T,
}

impl<T: ?Sized> Clone for RayHit<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for RayHit<'_, T> {}

impl<'a, T: ?Sized> RayHit<'a, T> {
    pub fn new(surface: SurfaceHit, object: &'a T) -> Self {
        Self { surface, object }
    }

    #[inline]
    pub fn distance(&self) -> f32 {
        self.surface.distance
    }

    /// Keep whichever of two optional hits is closer.
    pub fn closest(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if b.distance() < a.distance() { b } else { a }),
            (a, None) => a,
            (None, b) => b,
        }
    }
}
