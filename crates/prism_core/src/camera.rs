//! Perspective camera and per-pixel ray generation.

use prism_math::{Cached, Mat4, Mat4Ext, Ray, Vec3};
use rand::RngCore;

use crate::sampling::random_in_unit_disk;
use crate::transform::Transform;

/// Perspective camera in a left-handed, Y-up world looking down its local +Z.
///
/// View and projection matrices are cached and rebuilt on read after the
/// relevant setting changed.
#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    /// Vertical field of view in degrees
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    /// Lens diameter; zero disables depth of field
    aperture: f32,
    /// Distance from the camera to the plane of perfect focus
    focal_distance: f32,
    view: Cached<Mat4>,
    projection: Cached<Mat4>,
}

impl Camera {
    pub fn new(transform: Transform, fov_y: f32, aspect: f32) -> Self {
        Self {
            transform,
            fov_y,
            aspect,
            near: 0.1,
            far: 1000.0,
            aperture: 0.0,
            focal_distance: 1.0,
            view: Cached::dirty(Mat4::IDENTITY),
            projection: Cached::dirty(Mat4::IDENTITY),
        }
    }

    /// Camera at `eye` facing `target`.
    pub fn looking_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32) -> Self {
        let mut camera = Self::new(Transform::from_position(eye), fov_y, aspect);
        camera.look_at(target);
        camera
    }

    /// Set lens settings.
    pub fn with_lens(mut self, aperture: f32, focal_distance: f32) -> Self {
        self.aperture = aperture.max(0.0);
        self.focal_distance = focal_distance;
        self
    }

    /// Set clip planes.
    pub fn with_clip_planes(mut self, near: f32, far: f32) -> Self {
        self.set_clip_planes(near, far);
        self
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Edit the camera placement.
    pub fn modify_transform<R>(&mut self, f: impl FnOnce(&mut Transform) -> R) -> R {
        self.view.invalidate();
        f(&mut self.transform)
    }

    /// Turn the camera toward `target` without rolling it.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.transform.position).try_normalize() else {
            return;
        };
        // forward = (cos p sin y, -sin p, cos p cos y) for rotation (p, y, 0)
        let pitch = (-dir.y).clamp(-1.0, 1.0).asin();
        let yaw = dir.x.atan2(dir.z);
        self.modify_transform(|t| t.set_rotation(Vec3::new(pitch, yaw, 0.0)));
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn aperture(&self) -> f32 {
        self.aperture
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }

    pub fn set_fov_y(&mut self, fov_y: f32) {
        self.fov_y = fov_y;
        self.projection.invalidate();
    }

    /// Update aspect ratio (e.g., on resize)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection.invalidate();
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.projection.invalidate();
    }

    pub fn set_aperture(&mut self, aperture: f32) {
        self.aperture = aperture.max(0.0);
    }

    pub fn set_focal_distance(&mut self, focal_distance: f32) {
        self.focal_distance = focal_distance;
    }

    pub fn is_view_dirty(&self) -> bool {
        self.view.is_dirty()
    }

    pub fn is_projection_dirty(&self) -> bool {
        self.projection.is_dirty()
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&mut self) -> Mat4 {
        let transform = &self.transform;
        *self
            .view
            .get_or_update(|| Mat4::look_to_lh(transform.position, transform.forward(), transform.up()))
    }

    /// Get the projection matrix (camera → clip space, depth 0..1)
    pub fn projection_matrix(&mut self) -> Mat4 {
        let (fov_y, aspect, near, far) = (self.fov_y, self.aspect, self.near, self.far);
        *self
            .projection
            .get_or_update(|| Mat4::perspective_lh(fov_y.to_radians(), aspect, near, far))
    }

    /// Immutable snapshot for generating rays from many threads.
    pub fn rays(&mut self) -> CameraRays {
        let view_projection = self.projection_matrix() * self.view_matrix();
        CameraRays {
            inverse_view_projection: view_projection.inverse_or_identity(),
            position: self.transform.position,
            forward: self.transform.forward(),
            right: self.transform.right(),
            up: self.transform.up(),
            aperture: self.aperture,
            focal_distance: self.focal_distance,
        }
    }

    /// Ray through pixel coordinate (`x`, `y`) of a `width` x `height` image.
    pub fn ray_through_pixel(
        &mut self,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
        rng: &mut dyn RngCore,
    ) -> Ray {
        self.rays().ray_through_pixel(x, y, width, height, rng)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Transform::default(), 60.0, 16.0 / 9.0)
    }
}

/// Camera state frozen for one render.
#[derive(Debug, Clone, Copy)]
pub struct CameraRays {
    inverse_view_projection: Mat4,
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    aperture: f32,
    focal_distance: f32,
}

impl CameraRays {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Ray through pixel coordinate (`x`, `y`); (0, 0) is the top-left corner
    /// of the image and fractional coordinates address sub-pixel positions.
    pub fn ray_through_pixel(
        &self,
        x: f32,
        y: f32,
        width: u32,
        height: u32,
        rng: &mut dyn RngCore,
    ) -> Ray {
        // Image row 0 is the top, NDC +Y is up
        let ndc_x = 2.0 * x / width.max(1) as f32 - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1) as f32;

        let far_point = self
            .inverse_view_projection
            .project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        let direction = (far_point - self.position).normalize_or_zero();

        if self.aperture <= 0.0 {
            return Ray::new(self.position, direction);
        }

        // Thin lens: every ray through this pixel meets on the focal plane
        let along = direction.dot(self.forward);
        if along <= 0.0 {
            return Ray::new(self.position, direction);
        }
        let focus_point = self.position + direction * (self.focal_distance / along);
        let lens = random_in_unit_disk(rng) * (self.aperture * 0.5);
        let origin = self.position + self.right * lens.x + self.up * lens.y;
        Ray::new(origin, focus_point - origin)
    }
}
