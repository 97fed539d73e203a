//! Scene entities: geometry placed in the world by a transform and shaded by a material.

use std::sync::Arc;

use prism_math::{Aabb, Interval, Mat4Ext, Ray};

use crate::geometry::Geometry;
use crate::hit::SurfaceHit;
use crate::material::Material;
use crate::octree::Spatial;
use crate::transform::{TransformGraph, TransformId, TransformResult, WorldMatrices};

/// A renderable object.
///
/// Geometry and material are shared; many entities can reference the same
/// mesh. The world matrices and world bounds are a snapshot taken from the
/// transform graph by [`Entity::sync`], so intersection never touches the graph.
#[derive(Debug, Clone)]
pub struct Entity {
    name: String,
    transform: TransformId,
    geometry: Arc<Geometry>,
    material: Arc<Material>,
    matrices: WorldMatrices,
    world_bounds: Aabb,
}

impl Entity {
    pub fn new(
        name: impl Into<String>,
        transform: TransformId,
        geometry: Arc<Geometry>,
        material: Arc<Material>,
    ) -> Self {
        let world_bounds = geometry.bounds();
        Self {
            name: name.into(),
            transform,
            geometry,
            material,
            matrices: WorldMatrices::IDENTITY,
            world_bounds,
        }
    }

    /// Refresh the world matrices and world bounds from `graph`.
    pub fn sync(&mut self, graph: &mut TransformGraph) -> TransformResult<()> {
        self.matrices = graph.world_matrices(self.transform)?;
        self.world_bounds = self.geometry.bounds().transformed(&self.matrices.world);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transform(&self) -> TransformId {
        self.transform
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn world_matrices(&self) -> &WorldMatrices {
        &self.matrices
    }

    pub fn world_bounds(&self) -> Aabb {
        self.world_bounds
    }

    /// World-space intersection.
    ///
    /// The ray is moved into local space; local ray parameters are rescaled by
    /// the length of the transformed direction so the returned distance is a
    /// world-space ray parameter.
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        let inverse = &self.matrices.inverse;
        let local_direction = inverse.transform_direction(ray.direction);
        let scale = local_direction.length();
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }

        let local_ray = Ray::with_window(
            inverse.transform_point3(ray.origin),
            local_direction,
            Interval::new(ray.t_min() * scale, ray.t_max() * scale),
        );
        let local = self.geometry.intersect(&local_ray)?;

        let world = &self.matrices.world;
        Some(SurfaceHit {
            position: world.transform_point3(local.position),
            normal: self
                .matrices
                .normal
                .transform_direction(local.normal)
                .normalize_or_zero(),
            uv: local.uv,
            distance: local.distance / scale,
            side: local.side,
        })
    }
}

impl Spatial for Entity {
    fn bounds(&self) -> Aabb {
        self.world_bounds
    }

    fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        Entity::intersect(self, ray)
    }
}
