// Re-export glam for convenience
pub use glam::*;

// Prism math types
mod aabb;
mod cached;
mod interval;
mod ray;
mod transform;

pub use aabb::{Aabb, Containment};
pub use cached::Cached;
pub use interval::Interval;
pub use ray::{Ray, RAY_EPSILON};
pub use transform::{Mat4Ext, SINGULAR_EPSILON};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glam_reexport() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
    }
}
