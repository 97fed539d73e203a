// Transform utilities for Mat4
//
// Extends glam::Mat4 with the helpers the scene and the renderer need.
// Note: glam::Mat4 already provides transform_point3() and inverse()

use glam::{Mat4, Vec3, Vec4};
use crate::Aabb;

/// Determinant magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f32 = 1e-12;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a vector in 3D space (applies rotation and scale, but NOT translation).
    /// Vectors have an implicit w=0 component.
    fn transform_direction(&self, vector: Vec3) -> Vec3;

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Inverse, or `None` when the matrix is singular.
    fn try_inverse(&self) -> Option<Mat4>;

    /// Inverse that falls back to the identity for singular matrices.
    ///
    /// Rendering continues with a wrong but finite placement instead of
    /// propagating NaNs; a warning is logged every time this happens.
    fn inverse_or_identity(&self) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn transform_direction(&self, vector: Vec3) -> Vec3 {
        // w=0, translation must not affect directions
        let transformed = *self * Vec4::new(vector.x, vector.y, vector.z, 0.0);
        transformed.truncate()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        Aabb::enclosing(aabb.corners().into_iter().map(|c| self.transform_point3(c)))
    }

    fn try_inverse(&self) -> Option<Mat4> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
            return None;
        }
        Some(self.inverse())
    }

    fn inverse_or_identity(&self) -> Mat4 {
        self.try_inverse().unwrap_or_else(|| {
            log::warn!("Singular matrix (det = {}), substituting identity", self.determinant());
            Mat4::IDENTITY
        })
    }
}
