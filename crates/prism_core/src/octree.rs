//! Octree spatial index over boundable, ray-intersectable objects.
//!
//! Each node owns the objects whose bounds it fully contains but none of its
//! children do. A leaf turns into a divided node once it holds
//! [`DEFAULT_THRESHOLD`] objects (configurable); division pushes every object
//! that fits entirely inside one octant down into that octant. Objects that
//! straddle a split plane stay where they are and are never duplicated.

use std::sync::Arc;

use prism_math::{Aabb, Ray};

use crate::hit::{RayHit, SurfaceHit};

/// Direct object count that triggers a leaf's division.
pub const DEFAULT_THRESHOLD: usize = 3;

/// Nodes at this depth never divide.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Objects the octree can index.
pub trait Spatial {
    /// World-space bounds of the object.
    fn bounds(&self) -> Aabb;

    /// Closest hit along `ray` within its window.
    fn intersect(&self, ray: &Ray) -> Option<SurfaceHit>;
}

impl<T: Spatial + ?Sized> Spatial for Arc<T> {
    fn bounds(&self) -> Aabb {
        (**self).bounds()
    }

    fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
        (**self).intersect(ray)
    }
}

/// Shape of an octree, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OctreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub objects: usize,
    pub max_depth: usize,
    /// Number of leaf to divided transitions since construction.
    pub divisions: usize,
}

#[derive(Debug)]
struct Node<T> {
    bounds: Aabb,
    depth: usize,
    /// Objects stored here, with their bounds captured at insertion.
    objects: Vec<(Aabb, T)>,
    children: Option<Vec<Node<T>>>,
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    threshold: usize,
    max_depth: usize,
}

impl<T: Spatial> Node<T> {
    fn new(bounds: Aabb, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            objects: Vec::new(),
            children: None,
        }
    }

    /// Caller guarantees `self.bounds` contains `bounds`.
    fn insert(&mut self, bounds: Aabb, object: T, limits: Limits, divisions: &mut usize) {
        if let Some(children) = &mut self.children {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains(&bounds)) {
                child.insert(bounds, object, limits, divisions);
                return;
            }
        }

        self.objects.push((bounds, object));

        if self.children.is_none()
            && self.objects.len() >= limits.threshold
            && self.depth < limits.max_depth
        {
            self.divide(limits, divisions);
        }
    }

    fn divide(&mut self, limits: Limits, divisions: &mut usize) {
        let mut children: Vec<Node<T>> = (0..8)
            .map(|i| Node::new(self.bounds.octant(i), self.depth + 1))
            .collect();
        *divisions += 1;

        let mut kept = Vec::new();
        for (bounds, object) in self.objects.drain(..) {
            match children.iter_mut().find(|c| c.bounds.contains(&bounds)) {
                Some(child) => child.insert(bounds, object, limits, divisions),
                None => kept.push((bounds, object)),
            }
        }

        self.objects = kept;
        self.children = Some(children);
    }

    fn ray_intersection<'a>(&'a self, ray: &Ray, closest: &mut Option<RayHit<'a, T>>) {
        let Some(entry) = self.bounds.ray_intersection(ray) else {
            return;
        };
        if closest.is_some_and(|hit| entry > hit.distance()) {
            return;
        }

        for (bounds, object) in &self.objects {
            if bounds.ray_intersection(ray).is_none() {
                continue;
            }
            if let Some(surface) = object.intersect(ray) {
                *closest = RayHit::closest(*closest, Some(RayHit::new(surface, object)));
            }
        }

        // Every child, not just the entered one
        if let Some(children) = &self.children {
            for child in children {
                child.ray_intersection(ray, closest);
            }
        }
    }

    /// Tighten bounds to the contents; returns false when nothing is left.
    fn shrink_and_prune(&mut self) -> bool {
        let mut bounds = Aabb::EMPTY;
        for (object_bounds, _) in &self.objects {
            bounds.encompass(object_bounds);
        }

        if let Some(children) = &mut self.children {
            children.retain_mut(|child| child.shrink_and_prune());
            for child in children.iter() {
                bounds.encompass(&child.bounds);
            }
        }

        self.bounds = bounds;
        !self.objects.is_empty() || self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    fn collect_stats(&self, stats: &mut OctreeStats) {
        stats.nodes += 1;
        stats.objects += self.objects.len();
        stats.max_depth = stats.max_depth.max(self.depth);
        match &self.children {
            Some(children) if !children.is_empty() => {
                for child in children {
                    child.collect_stats(stats);
                }
            }
            _ => stats.leaves += 1,
        }
    }
}

/// An octree over `T`.
#[derive(Debug)]
pub struct Octree<T> {
    root: Node<T>,
    limits: Limits,
    len: usize,
    divisions: usize,
}

impl<T: Spatial> Octree<T> {
    /// Empty octree covering `bounds` with the default threshold.
    pub fn new(bounds: Aabb) -> Self {
        Self::with_threshold(bounds, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(bounds: Aabb, threshold: usize) -> Self {
        Self {
            root: Node::new(bounds, 0),
            limits: Limits {
                threshold: threshold.max(1),
                max_depth: DEFAULT_MAX_DEPTH,
            },
            len: 0,
            divisions: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.limits.max_depth = max_depth;
        self
    }

    /// Current root bounds.
    pub fn bounds(&self) -> Aabb {
        self.root.bounds
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert an object, handing it back if its bounds are not fully inside the root.
    pub fn insert(&mut self, object: T) -> Result<(), T> {
        let bounds = object.bounds();
        if !self.root.bounds.contains(&bounds) {
            return Err(object);
        }

        self.root.insert(bounds, object, self.limits, &mut self.divisions);
        self.len += 1;
        Ok(())
    }

    /// Globally closest hit along `ray`.
    pub fn ray_intersection(&self, ray: &Ray) -> Option<RayHit<'_, T>> {
        let mut closest = None;
        self.root.ray_intersection(ray, &mut closest);
        closest
    }

    /// Shrink every node to the union of its contents and drop empty subtrees.
    ///
    /// Meant to run once after bulk insertion; later inserts are checked against
    /// the shrunken root bounds.
    pub fn shrink_and_prune(&mut self) {
        if !self.root.shrink_and_prune() {
            self.root.children = None;
        }
        log::debug!("Octree after shrink and prune: {:?}", self.stats());
    }

    /// Iterate over every stored object.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            stack: vec![&self.root],
            current: [].iter(),
        }
    }

    pub fn stats(&self) -> OctreeStats {
        let mut stats = OctreeStats {
            divisions: self.divisions,
            ..Default::default()
        };
        self.root.collect_stats(&mut stats);
        stats
    }
}

/// Depth-first iterator over octree objects.
pub struct Iter<'a, T> {
    stack: Vec<&'a Node<T>>,
    current: std::slice::Iter<'a, (Aabb, T)>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some((_, object)) = self.current.next() {
                return Some(object);
            }
            let node = self.stack.pop()?;
            if let Some(children) = &node.children {
                self.stack.extend(children.iter());
            }
            self.current = node.objects.iter();
        }
    }
}

impl<'a, T: Spatial> IntoIterator for &'a Octree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Sphere;
    use prism_math::Vec3;

    #[derive(Debug)]
    struct Ball {
        id: usize,
        sphere: Sphere,
    }

    impl Ball {
        fn new(id: usize, center: Vec3, radius: f32) -> Self {
            Self {
                id,
                sphere: Sphere::new(center, radius),
            }
        }
    }

    impl Spatial for Ball {
        fn bounds(&self) -> Aabb {
            self.sphere.bounds()
        }

        fn intersect(&self, ray: &Ray) -> Option<SurfaceHit> {
            self.sphere.intersect(ray)
        }
    }

    fn scene_bounds() -> Aabb {
        Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0))
    }

    fn five_balls() -> Vec<Ball> {
        // One per octant, so no child ever reaches the threshold
        vec![
            Ball::new(0, Vec3::new(-5.0, -5.0, -5.0), 0.5),
            Ball::new(1, Vec3::new(5.0, -5.0, -5.0), 0.5),
            Ball::new(2, Vec3::new(-5.0, 5.0, -5.0), 0.5),
            Ball::new(3, Vec3::new(5.0, 5.0, 5.0), 0.5),
            Ball::new(4, Vec3::new(-5.0, -5.0, 5.0), 0.5),
        ]
    }

    #[test]
    fn test_five_objects_divide_once() {
        let mut octree = Octree::with_threshold(scene_bounds(), 3);
        let balls = five_balls();
        let targets: Vec<Vec3> = balls.iter().map(|b| b.sphere.center()).collect();

        for ball in balls {
            assert!(octree.insert(ball).is_ok());
        }

        let stats = octree.stats();
        assert_eq!(stats.divisions, 1);
        assert_eq!(stats.objects, 5);
        assert_eq!(octree.len(), 5);

        for (id, target) in targets.into_iter().enumerate() {
            let origin = Vec3::new(0.0, 0.0, 0.0);
            let ray = Ray::new(origin, target - origin);
            let hit = octree.ray_intersection(&ray).expect("object reachable");
            assert_eq!(hit.object.id, id);
        }
    }

    #[test]
    fn test_insert_outside_bounds_returns_object() {
        let mut octree = Octree::new(scene_bounds());
        let outside = Ball::new(7, Vec3::new(9.8, 0.0, 0.0), 0.5);
        let rejected = octree.insert(outside).unwrap_err();
        assert_eq!(rejected.id, 7);
        assert!(octree.is_empty());
    }

    #[test]
    fn test_straddlers_stay_at_parent() {
        let mut octree = Octree::new(scene_bounds());
        // Centered on the split planes
        for id in 0..3 {
            octree
                .insert(Ball::new(id, Vec3::new(0.0, id as f32 - 1.0, 0.0), 0.5))
                .unwrap();
        }
        let stats = octree.stats();
        assert_eq!(stats.divisions, 1);
        assert_eq!(octree.root.objects.len(), 3);
        assert_eq!(octree.iter().count(), 3);
    }

    #[test]
    fn test_closest_hit_across_levels() {
        let mut octree = Octree::new(scene_bounds());
        // Large straddler at the root behind a small ball deep in an octant
        octree.insert(Ball::new(0, Vec3::new(0.0, 0.0, 0.0), 2.0)).unwrap();
        octree.insert(Ball::new(1, Vec3::new(-5.0, -5.0, -5.0), 0.5)).unwrap();
        octree.insert(Ball::new(2, Vec3::new(5.0, 5.0, 5.0), 0.5)).unwrap();
        octree.insert(Ball::new(3, Vec3::new(0.0, 0.0, -6.0), 0.5)).unwrap();

        let ray = Ray::new(Vec3::new(0.0, 0.0, -9.0), Vec3::Z);
        let hit = octree.ray_intersection(&ray).expect("hit");
        assert_eq!(hit.object.id, 3);
        assert!((hit.distance() - 2.5).abs() < 1e-4);

        let ray = Ray::new(Vec3::new(0.0, 0.0, -4.0), Vec3::Z);
        assert_eq!(octree.ray_intersection(&ray).unwrap().object.id, 0);
    }

    #[test]
    fn test_ray_missing_everything() {
        let mut octree = Octree::new(scene_bounds());
        for ball in five_balls() {
            octree.insert(ball).unwrap();
        }
        let ray = Ray::new(Vec3::new(0.0, 20.0, 0.0), Vec3::Y);
        assert!(octree.ray_intersection(&ray).is_none());
    }

    #[test]
    fn test_shrink_and_prune_preserves_hits() {
        let mut octree = Octree::new(scene_bounds());
        for ball in five_balls() {
            octree.insert(ball).unwrap();
        }

        let rays: Vec<Ray> = (0..40)
            .map(|i| {
                let angle = i as f32 * 0.37;
                let dir = Vec3::new(angle.cos(), (angle * 0.7).sin(), angle.sin());
                Ray::new(Vec3::ZERO, dir)
            })
            .chain(five_balls().iter().map(|b| Ray::new(Vec3::ZERO, b.sphere.center())))
            .collect();
        let before: Vec<Option<usize>> = rays
            .iter()
            .map(|r| octree.ray_intersection(r).map(|h| h.object.id))
            .collect();

        octree.shrink_and_prune();

        let after: Vec<Option<usize>> = rays
            .iter()
            .map(|r| octree.ray_intersection(r).map(|h| h.object.id))
            .collect();
        assert_eq!(before, after);

        let stats = octree.stats();
        // Root plus the five occupied octants
        assert_eq!(stats.nodes, 6);
        assert_eq!(stats.objects, 5);
        assert_eq!(octree.bounds().min, Vec3::splat(-5.5));
        assert_eq!(octree.bounds().max, Vec3::splat(5.5));
    }

    #[test]
    fn test_max_depth_stops_division() {
        let mut octree = Octree::with_threshold(scene_bounds(), 2).with_max_depth(2);
        for id in 0..10 {
            octree.insert(Ball::new(id, Vec3::splat(7.0), 0.1)).unwrap();
        }
        let stats = octree.stats();
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.objects, 10);
    }

    #[test]
    fn test_arc_objects() {
        let mut octree = Octree::new(scene_bounds());
        let ball = Arc::new(Ball::new(0, Vec3::ZERO, 1.0));
        octree.insert(Arc::clone(&ball)).unwrap();

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let hit = octree.ray_intersection(&ray).unwrap();
        assert!(Arc::ptr_eq(hit.object, &ball));
    }
}
