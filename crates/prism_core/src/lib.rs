//! Prism Core - scene construction for the Prism path tracer.
//!
//! This crate provides:
//!
//! - **Transforms**: `Transform` nodes linked in a `TransformGraph` arena
//! - **Geometry**: analytic spheres and indexed triangle meshes (OBJ via `tobj`)
//! - **Shading inputs**: materials, textures, cubemaps and environments
//! - **Scene**: entities indexed by an `Octree`, queried for closest hits
//! - **Camera**: perspective camera with thin-lens depth of field
//!
//! # Example
//!
//! ```ignore
//! use prism_core::{Entity, Geometry, Material, Scene, Sphere, Transform};
//!
//! let mut scene = Scene::new("demo", Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0)));
//! let id = scene.transforms_mut().insert(Transform::from_position(Vec3::Z * 5.0));
//! scene.add(Entity::new(
//!     "ball",
//!     id,
//!     Arc::new(Geometry::from(Sphere::new(Vec3::ZERO, 1.0))),
//!     Arc::new(Material::diffuse(Vec3::splat(0.5))),
//! ))?;
//! scene.finalize_octree();
//! ```

pub mod camera;
pub mod entity;
pub mod environment;
pub mod geometry;
pub mod hit;
pub mod material;
pub mod mesh;
pub mod octree;
pub mod sampling;
pub mod scene;
pub mod texture;
pub mod transform;

// Re-export commonly used types
pub use camera::{Camera, CameraRays};
pub use entity::Entity;
pub use environment::Environment;
pub use geometry::{Geometry, Sphere};
pub use hit::{RayHit, Side, SurfaceHit};
pub use material::{Color, Diffuse, Emissive, Material, Metal, Scatter, TextureMap, Transparent};
pub use mesh::{Mesh, MeshError};
pub use octree::{Octree, OctreeStats, Spatial};
pub use scene::{Scene, SceneError, SceneResult};
pub use texture::{AddressMode, Cubemap, Filter, Texture, TextureError, TextureSampling};
pub use transform::{Transform, TransformError, TransformGraph, TransformId, WorldMatrices};
