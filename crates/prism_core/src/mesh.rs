//! Indexed triangle meshes.
//!
//! A mesh keeps positions, per-vertex normals, optional UVs and a flat index
//! list (every 3 indices form a triangle). Intersection is a linear scan over
//! all triangles using the Möller-Trumbore test; the closest triangle wins.

use std::path::Path;

use prism_math::{Aabb, Ray, Vec2, Vec3};
use thiserror::Error;

use crate::hit::{Side, SurfaceHit};

/// Determinant magnitude below which a ray counts as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Errors that can occur while building or loading a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("OBJ loading error: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("Mesh has no triangles")]
    NoTriangles,

    #[error("Index count {0} is not a multiple of 3")]
    BadIndexCount(usize),

    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{attribute} count {count} does not match vertex count {vertex_count}")]
    AttributeMismatch {
        attribute: &'static str,
        count: usize,
        vertex_count: usize,
    },
}

pub type MeshResult<T> = Result<T, MeshError>;

/// A mesh consisting of vertex positions, normals, optional UVs and triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    uvs: Option<Vec<Vec2>>,
    indices: Vec<u32>,
    bounds: Aabb,
    cull_back_faces: bool,
}

impl Mesh {
    /// Create a mesh, validating indices and attribute counts.
    ///
    /// Missing normals are computed by averaging face normals.
    pub fn new(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<Vec2>>,
    ) -> MeshResult<Self> {
        let vertex_count = positions.len();
        if indices.is_empty() {
            return Err(MeshError::NoTriangles);
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::BadIndexCount(indices.len()));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange { index, vertex_count });
        }
        if let Some(uvs) = &uvs {
            if uvs.len() != vertex_count {
                return Err(MeshError::AttributeMismatch {
                    attribute: "UV",
                    count: uvs.len(),
                    vertex_count,
                });
            }
        }

        let normals = match normals {
            Some(normals) if normals.len() == vertex_count => normals,
            Some(normals) => {
                return Err(MeshError::AttributeMismatch {
                    attribute: "Normal",
                    count: normals.len(),
                    vertex_count,
                })
            }
            None => compute_normals(&positions, &indices),
        };

        let bounds = Aabb::enclosing(positions.iter().copied());
        Ok(Self {
            positions,
            normals,
            uvs,
            indices,
            bounds,
            cull_back_faces: false,
        })
    }

    /// Unit square on the XZ plane centered at the origin, facing +Y.
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(-h, 0.0, h),
            Vec3::new(h, 0.0, h),
            Vec3::new(h, 0.0, -h),
        ];
        let uvs = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ];
        Self::from_parts(positions, vec![Vec3::Y; 4], uvs, vec![0, 1, 2, 0, 2, 3])
    }

    /// Axis-aligned cube centered at the origin with outward faces.
    pub fn cube(size: f32) -> Self {
        // (normal, u axis, v axis) with u x v == normal
        const FACES: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let h = size * 0.5;
        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (normal, u, v) in FACES {
            let base = positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                positions.push((normal + u * su + v * sv) * h);
                normals.push(normal);
                uvs.push(Vec2::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self::from_parts(positions, normals, uvs, indices)
    }

    /// Load every model of an OBJ file into a single mesh.
    pub fn load_obj(path: impl AsRef<Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();
        let mut all_normals = true;
        let mut all_uvs = true;

        for model in &models {
            let mesh = &model.mesh;
            let base = positions.len() as u32;
            let vertex_count = mesh.positions.len() / 3;

            positions.extend(mesh.positions.chunks_exact(3).map(Vec3::from_slice));
            if mesh.normals.len() == vertex_count * 3 {
                normals.extend(mesh.normals.chunks_exact(3).map(Vec3::from_slice));
            } else {
                all_normals = false;
            }
            if mesh.texcoords.len() == vertex_count * 2 {
                uvs.extend(mesh.texcoords.chunks_exact(2).map(Vec2::from_slice));
            } else {
                all_uvs = false;
            }
            indices.extend(mesh.indices.iter().map(|&i| i + base));
        }

        log::info!(
            "Loaded {}: {} models, {} vertices, {} triangles",
            path.display(),
            models.len(),
            positions.len(),
            indices.len() / 3
        );
        if !all_normals {
            log::info!("Computing smooth normals for {}", path.display());
        }

        Self::new(
            positions,
            indices,
            all_normals.then_some(normals),
            all_uvs.then_some(uvs),
        )
    }

    /// Enable or disable skipping triangles seen from behind.
    pub fn with_back_face_culling(mut self, cull: bool) -> Self {
        self.cull_back_faces = cull;
        self
    }

    fn from_parts(positions: Vec<Vec3>, normals: Vec<Vec3>, uvs: Vec<Vec2>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::enclosing(positions.iter().copied());
        Self {
            positions,
            normals,
            uvs: Some(uvs),
            indices,
            bounds,
            cull_back_faces: false,
        }
    }

    /// Local-space bounding box.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Closest triangle hit along `ray`, in mesh-local space.
    pub fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        if ray.is_degenerate() {
            return None;
        }

        let mut closest: Option<SurfaceHit> = None;
        let mut t_max = ray.t_max();

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let Some((t, u, v, front)) = self.intersect_triangle(ray, i0, i1, i2, t_max) else {
                continue;
            };

            let w = 1.0 - u - v;
            let normal = (self.normals[i0] * w + self.normals[i1] * u + self.normals[i2] * v)
                .normalize_or_zero();
            let uv = match &self.uvs {
                Some(uvs) => uvs[i0] * w + uvs[i1] * u + uvs[i2] * v,
                None => Vec2::new(u, v),
            };

            t_max = t;
            closest = Some(SurfaceHit {
                position: ray.at(t),
                normal,
                uv,
                distance: t,
                side: if front { Side::Outside } else { Side::Inside },
            });
        }

        closest
    }

    /// Möller-Trumbore ray-triangle intersection algorithm.
    ///
    /// Returns `(t, u, v, front_face)`.
    fn intersect_triangle(
        &self,
        ray: &Ray,
        i0: usize,
        i1: usize,
        i2: usize,
        t_max: f32,
    ) -> Option<(f32, f32, f32, bool)> {
        let v0 = self.positions[i0];
        let edge1 = self.positions[i1] - v0;
        let edge2 = self.positions[i2] - v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // a > 0 when the ray travels against the face normal (edge1 x edge2)
        if self.cull_back_faces {
            if a < PARALLEL_EPSILON {
                return None;
            }
        } else if a.abs() < PARALLEL_EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if t < ray.t_min() || t > t_max {
            return None;
        }

        Some((t, u, v, a > 0.0))
    }
}

/// Smooth vertex normals: normalized sum of adjacent face normals.
fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for face in indices.chunks_exact(3) {
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
        let p0 = positions[i0];
        let face_normal = (positions[i1] - p0).cross(positions[i2] - p0);

        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }

    normals
}
