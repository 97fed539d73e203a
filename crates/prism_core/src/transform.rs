//! Position/rotation/scale nodes and the parent/child graph that links them.
//!
//! Transforms live in a [`TransformGraph`] arena and are addressed by
//! [`TransformId`]. Parents own their children through id lists; children
//! refer back to their parent by id only. World matrices are cached per node
//! and rebuilt lazily: mutating a node dirties it and every descendant, and the
//! next read recomputes only what is dirty.

use prism_math::{Cached, EulerRot, Mat4, Mat4Ext, Quat, Vec3};
use thiserror::Error;

/// Errors from transform graph edits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Unknown transform id {0:?}")]
    UnknownTransform(TransformId),

    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    Cycle { child: TransformId, parent: TransformId },
}

pub type TransformResult<T> = Result<T, TransformError>;

/// Local placement: translation, Euler rotation and scale.
///
/// Rotation is stored as (pitch, yaw, roll) in radians around X, Y and Z and
/// applied yaw first, then pitch, then roll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Decompose a 4x4 matrix into position, rotation and scale.
    ///
    /// Shear cannot be represented and is lost.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
        Self {
            position,
            rotation: Vec3::new(pitch, yaw, roll),
            scale,
        }
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z)
    }

    /// Scale, then rotate, then translate.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.position)
    }

    /// Move along world axes.
    pub fn translate_world(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Move along the transform's own rotated axes.
    pub fn translate_local(&mut self, delta: Vec3) {
        self.position += self.orientation() * delta;
    }

    /// Add (pitch, yaw, roll) to the current rotation.
    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
    }

    /// Multiply the current scale componentwise.
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale *= factor;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// Local +Z axis (left-handed forward).
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation() * Vec3::Y
    }
}

/// Stable handle into a [`TransformGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(usize);

impl TransformId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// World matrix plus the derived matrices intersection code needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldMatrices {
    pub world: Mat4,
    pub inverse: Mat4,
    /// Inverse-transpose of `world`, for transforming normals.
    pub normal: Mat4,
}

impl WorldMatrices {
    pub const IDENTITY: WorldMatrices = WorldMatrices {
        world: Mat4::IDENTITY,
        inverse: Mat4::IDENTITY,
        normal: Mat4::IDENTITY,
    };

    /// Derive inverse and normal matrix from a world matrix.
    ///
    /// Singular matrices get an identity inverse (see [`Mat4Ext::inverse_or_identity`]).
    pub fn from_world(world: Mat4) -> Self {
        let inverse = world.inverse_or_identity();
        Self {
            world,
            inverse,
            normal: inverse.transpose(),
        }
    }
}

#[derive(Clone, Debug)]
struct TransformNode {
    local: Transform,
    parent: Option<TransformId>,
    children: Vec<TransformId>,
    world: Cached<WorldMatrices>,
}

/// Arena of transforms linked into a forest.
#[derive(Clone, Debug, Default)]
pub struct TransformGraph {
    nodes: Vec<TransformNode>,
}

impl TransformGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a root transform.
    pub fn insert(&mut self, local: Transform) -> TransformId {
        let id = TransformId(self.nodes.len());
        self.nodes.push(TransformNode {
            local,
            parent: None,
            children: Vec::new(),
            world: Cached::dirty(WorldMatrices::IDENTITY),
        });
        id
    }

    /// Add a transform parented to `parent`; `local` is relative to it.
    pub fn insert_child(&mut self, parent: TransformId, local: Transform) -> TransformResult<TransformId> {
        self.check(parent)?;
        let id = self.insert(local);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn contains(&self, id: TransformId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Local transform of a node.
    pub fn get(&self, id: TransformId) -> TransformResult<&Transform> {
        self.node(id).map(|n| &n.local)
    }

    pub fn parent(&self, id: TransformId) -> TransformResult<Option<TransformId>> {
        self.node(id).map(|n| n.parent)
    }

    pub fn children(&self, id: TransformId) -> TransformResult<&[TransformId]> {
        self.node(id).map(|n| n.children.as_slice())
    }

    /// Every node below `id`, depth first, excluding `id`.
    pub fn descendants(&self, id: TransformId) -> TransformResult<Vec<TransformId>> {
        self.check(id)?;
        let mut out = Vec::new();
        let mut stack: Vec<TransformId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        Ok(out)
    }

    /// True if a cached world matrix is waiting to be rebuilt.
    pub fn is_dirty(&self, id: TransformId) -> TransformResult<bool> {
        self.node(id).map(|n| n.world.is_dirty())
    }

    /// Mutate the local transform of `id` and dirty its subtree.
    ///
    /// ```ignore
    /// graph.modify(id, |t| t.translate_local(Vec3::Z))?;
    /// ```
    pub fn modify<R>(&mut self, id: TransformId, f: impl FnOnce(&mut Transform) -> R) -> TransformResult<R> {
        self.check(id)?;
        let result = f(&mut self.nodes[id.0].local);
        self.invalidate(id);
        Ok(result)
    }

    /// Replace the local transform of `id`.
    pub fn set(&mut self, id: TransformId, local: Transform) -> TransformResult<()> {
        self.modify(id, |t| *t = local)
    }

    /// Move `child` under `parent`, or detach it when `parent` is `None`.
    ///
    /// With `keep_world` the child's local transform is recomposed so its
    /// world placement does not change; otherwise the local transform is kept
    /// and the child moves with its new parent.
    pub fn set_parent(
        &mut self,
        child: TransformId,
        parent: Option<TransformId>,
        keep_world: bool,
    ) -> TransformResult<()> {
        self.check(child)?;
        if let Some(parent) = parent {
            self.check(parent)?;
            if parent == child || self.is_ancestor(child, parent) {
                return Err(TransformError::Cycle { child, parent });
            }
        }

        if self.nodes[child.0].parent == parent {
            return Ok(());
        }

        if keep_world {
            let child_world = self.world_matrix(child)?;
            let new_parent_inverse = match parent {
                Some(p) => self.world_matrices(p)?.inverse,
                None => Mat4::IDENTITY,
            };
            self.nodes[child.0].local = Transform::from_matrix(new_parent_inverse * child_world);
        }

        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|&c| c != child);
        }
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(child);
        }
        self.nodes[child.0].parent = parent;
        self.invalidate(child);
        Ok(())
    }

    /// Up-to-date world matrix of `id`.
    pub fn world_matrix(&mut self, id: TransformId) -> TransformResult<Mat4> {
        self.world_matrices(id).map(|m| m.world)
    }

    /// Up-to-date world, inverse and normal matrices of `id`.
    pub fn world_matrices(&mut self, id: TransformId) -> TransformResult<WorldMatrices> {
        self.check(id)?;

        // Walk up to the nearest clean ancestor, then rebuild top-down.
        // Dirtying always propagates downward, so everything above a clean
        // node is clean too.
        let mut chain = vec![id];
        let mut cursor = self.nodes[id.0].parent;
        while let Some(p) = cursor {
            if !self.nodes[p.0].world.is_dirty() {
                break;
            }
            chain.push(p);
            cursor = self.nodes[p.0].parent;
        }

        let mut parent_world = match cursor {
            Some(p) => self.nodes[p.0].world.peek().map_or(Mat4::IDENTITY, |m| m.world),
            None => Mat4::IDENTITY,
        };
        for &node_id in chain.iter().rev() {
            let node = &mut self.nodes[node_id.0];
            let local = node.local.local_matrix();
            let matrices = *node
                .world
                .get_or_update(|| WorldMatrices::from_world(parent_world * local));
            parent_world = matrices.world;
        }

        Ok(*self.nodes[id.0].world.peek().unwrap_or(&WorldMatrices::IDENTITY))
    }

    /// World-space placement of `id`, decomposed back into a [`Transform`].
    pub fn world_transform(&mut self, id: TransformId) -> TransformResult<Transform> {
        self.world_matrix(id).map(Transform::from_matrix)
    }

    fn is_ancestor(&self, ancestor: TransformId, mut id: TransformId) -> bool {
        while let Some(p) = self.nodes[id.0].parent {
            if p == ancestor {
                return true;
            }
            id = p;
        }
        false
    }

    fn invalidate(&mut self, id: TransformId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = &mut self.nodes[next.0];
            node.world.invalidate();
            stack.extend(node.children.iter().copied());
        }
    }

    fn check(&self, id: TransformId) -> TransformResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(TransformError::UnknownTransform(id))
        }
    }

    fn node(&self, id: TransformId) -> TransformResult<&TransformNode> {
        self.nodes.get(id.0).ok_or(TransformError::UnknownTransform(id))
    }
}
