//! Local-space geometry: analytic spheres and triangle meshes.

use std::f32::consts::PI;

use prism_math::{Aabb, Ray, Vec2, Vec3};

use crate::hit::{Side, SurfaceHit};
use crate::mesh::Mesh;

/// A sphere primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
    /// Create a new sphere. Negative radii are clamped to zero.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn bounds(&self) -> Aabb {
        let rvec = Vec3::splat(self.radius);
        Aabb::new(self.center - rvec, self.center + rvec)
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn sphere_uv(p: Vec3) -> Vec2 {
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }

    /// Nearest root inside the ray window; the farther root counts as an
    /// `Inside` hit when the nearer one is out of range.
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        if ray.is_degenerate() || self.radius <= 0.0 {
            return None;
        }

        // Unit direction, so a == 1
        let oc = self.center - ray.origin;
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        let (root, side) = if ray.window.contains(h - sqrtd) {
            (h - sqrtd, Side::Outside)
        } else if ray.window.contains(h + sqrtd) {
            (h + sqrtd, Side::Inside)
        } else {
            return None;
        };

        let position = ray.at(root);
        let normal = (position - self.center) / self.radius;
        Some(SurfaceHit {
            position,
            normal,
            uv: Self::sphere_uv(normal),
            distance: root,
            side,
        })
    }
}

/// Shape data shared between entities.
#[derive(Debug, Clone)]
pub enum Geometry {
    Sphere(Sphere),
    Mesh(Mesh),
}

impl Geometry {
    /// Local-space bounding box.
    pub fn bounds(&self) -> Aabb {
        match self {
            Geometry::Sphere(sphere) => sphere.bounds(),
            Geometry::Mesh(mesh) => mesh.bounds(),
        }
    }

    /// Local-space ray intersection.
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        match self {
            Geometry::Sphere(sphere) => sphere.intersect(ray),
            Geometry::Mesh(mesh) => mesh.intersect(ray),
        }
    }
}

impl From<Sphere> for Geometry {
    fn from(sphere: Sphere) -> Self {
        Geometry::Sphere(sphere)
    }
}

impl From<Mesh> for Geometry {
    fn from(mesh: Mesh) -> Self {
        Geometry::Mesh(mesh)
    }
}
