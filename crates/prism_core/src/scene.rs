//! Scene: entities, their spatial index, the transform graph and the background.

use std::sync::Arc;

use prism_math::{Aabb, Ray};
use thiserror::Error;

use crate::entity::Entity;
use crate::environment::Environment;
use crate::geometry::Geometry;
use crate::hit::RayHit;
use crate::octree::Octree;
use crate::transform::{TransformError, TransformGraph};

/// Errors raised while building or updating a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Entity '{name}' ({bounds:?}) is not inside the scene bounds {scene:?}")]
    OutOfBounds { name: String, bounds: Aabb, scene: Aabb },

    #[error(transparent)]
    Transform(#[from] TransformError),
}

pub type SceneResult<T> = Result<T, SceneError>;

/// A renderable scene.
///
/// Every entity in the ordered list is also stored in the octree, and the
/// octree holds nothing else. The scene is read-only while a render runs.
#[derive(Debug)]
pub struct Scene {
    /// Scene name (for logging)
    pub name: String,
    bounds: Aabb,
    entities: Vec<Arc<Entity>>,
    octree: Octree<Arc<Entity>>,
    environment: Environment,
    transforms: TransformGraph,
    finalized: bool,
}

impl Scene {
    /// Empty scene whose entities must fit inside `bounds`.
    pub fn new(name: impl Into<String>, bounds: Aabb) -> Self {
        Self {
            name: name.into(),
            bounds,
            entities: Vec::new(),
            octree: Octree::new(bounds),
            environment: Environment::default(),
            transforms: TransformGraph::new(),
            finalized: false,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    /// Bounds every entity must fit inside.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn transforms(&self) -> &TransformGraph {
        &self.transforms
    }

    /// Transform edits take effect on the next [`Scene::refresh`].
    pub fn transforms_mut(&mut self) -> &mut TransformGraph {
        &mut self.transforms
    }

    pub fn entities(&self) -> &[Arc<Entity>] {
        &self.entities
    }

    pub fn octree(&self) -> &Octree<Arc<Entity>> {
        &self.octree
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Add an entity, snapshotting its world placement from the scene's transforms.
    ///
    /// Fails without modifying the scene when the entity's transform is unknown
    /// or its world bounds are not inside the scene bounds.
    pub fn add(&mut self, mut entity: Entity) -> SceneResult<Arc<Entity>> {
        entity.sync(&mut self.transforms)?;
        let entity = Arc::new(entity);

        if !self.bounds.contains(&entity.world_bounds()) {
            return Err(out_of_bounds(&entity, self.bounds));
        }

        // A shrunken octree may no longer cover the new entity
        if self.finalized {
            self.octree = build_octree(self.bounds, &self.entities)?;
            self.finalized = false;
        }

        if let Err(rejected) = self.octree.insert(Arc::clone(&entity)) {
            return Err(out_of_bounds(&rejected, self.bounds));
        }
        self.entities.push(Arc::clone(&entity));
        Ok(entity)
    }

    /// Tighten and prune the octree after bulk insertion.
    pub fn finalize_octree(&mut self) {
        self.octree.shrink_and_prune();
        self.finalized = true;

        let stats = self.octree.stats();
        log::info!(
            "Scene '{}': {} entities, {} triangles, octree {} nodes ({} leaves, depth {})",
            self.name,
            self.entities.len(),
            self.total_triangle_count(),
            stats.nodes,
            stats.leaves,
            stats.max_depth
        );
    }

    /// Re-snapshot every entity's world placement and rebuild the octree.
    ///
    /// The scene is left unchanged on error.
    pub fn refresh(&mut self) -> SceneResult<()> {
        let mut refreshed = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            let mut entity = Entity::clone(entity);
            entity.sync(&mut self.transforms)?;
            refreshed.push(Arc::new(entity));
        }

        let mut octree = build_octree(self.bounds, &refreshed)?;
        if self.finalized {
            octree.shrink_and_prune();
        }

        log::debug!("Refreshed {} entities in scene '{}'", refreshed.len(), self.name);
        self.entities = refreshed;
        self.octree = octree;
        Ok(())
    }

    /// Closest entity hit along `ray`.
    pub fn intersect(&self, ray: &Ray) -> Option<RayHit<'_, Arc<Entity>>> {
        self.octree.ray_intersection(ray)
    }

    /// Union of all entity world bounds.
    pub fn world_bounds(&self) -> Aabb {
        self.entities.iter().fold(Aabb::EMPTY, |mut bounds, entity| {
            bounds.encompass(&entity.world_bounds());
            bounds
        })
    }

    /// Get total triangle count across all mesh entities.
    pub fn total_triangle_count(&self) -> usize {
        self.entities
            .iter()
            .map(|e| match e.geometry().as_ref() {
                Geometry::Mesh(mesh) => mesh.triangle_count(),
                Geometry::Sphere(_) => 0,
            })
            .sum()
    }
}

fn build_octree(bounds: Aabb, entities: &[Arc<Entity>]) -> SceneResult<Octree<Arc<Entity>>> {
    let mut octree = Octree::new(bounds);
    for entity in entities {
        if let Err(rejected) = octree.insert(Arc::clone(entity)) {
            return Err(out_of_bounds(&rejected, bounds));
        }
    }
    Ok(octree)
}

fn out_of_bounds(entity: &Entity, scene: Aabb) -> SceneError {
    SceneError::OutOfBounds {
        name: entity.name().to_string(),
        bounds: entity.world_bounds(),
        scene,
    }
}
