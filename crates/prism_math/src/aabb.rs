use crate::{Mat4, Mat4Ext, Ray, Vec3};

/// Result of classifying one bounding box against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// The boxes are separated along at least one axis.
    NoOverlap,
    /// The other box lies entirely inside this one.
    Contains,
    /// The boxes overlap but the other box is not fully inside.
    Intersects,
}

/// Axis-aligned bounding box defined by its `min` and `max` corners.
///
/// A box only grows through [`Aabb::encompass`] and
/// [`Aabb::encompass_point`]; it never shrinks except by building a new one.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An empty box. Identity element for `encompass`.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a box from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.cmple(max).all(), "Aabb min {min:?} exceeds max {max:?}");
        Self { min, max }
    }

    /// Zero-volume box around a single point.
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Create a box from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box containing every point of the iterator.
    pub fn enclosing(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Aabb::EMPTY;
        for p in points {
            aabb.encompass_point(p);
        }
        aabb
    }

    /// Returns true if the box contains no points.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box so it contains `p`.
    pub fn encompass_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box so it contains `other`.
    pub fn encompass(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn volume(&self) -> f32 {
        let s = self.size();
        s.x * s.y * s.z
    }

    /// Returns the center point of the bounding box.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// One of the 8 corners. Bit 0 selects max x, bit 1 max y, bit 2 max z.
    ///
    /// # Panics
    ///
    /// Panics if `index > 7`.
    pub fn corner(&self, index: usize) -> Vec3 {
        assert!(index < 8, "Aabb corner index {index} out of range 0..8");
        Vec3::new(
            if index & 1 == 0 { self.min.x } else { self.max.x },
            if index & 2 == 0 { self.min.y } else { self.max.y },
            if index & 4 == 0 { self.min.z } else { self.max.z },
        )
    }

    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| self.corner(i))
    }

    /// Lower-x half.
    pub fn left_half(&self) -> Aabb {
        Aabb { min: self.min, max: Vec3::new(self.center().x, self.max.y, self.max.z) }
    }

    /// Upper-x half.
    pub fn right_half(&self) -> Aabb {
        Aabb { min: Vec3::new(self.center().x, self.min.y, self.min.z), max: self.max }
    }

    /// Lower-y half.
    pub fn bottom_half(&self) -> Aabb {
        Aabb { min: self.min, max: Vec3::new(self.max.x, self.center().y, self.max.z) }
    }

    /// Upper-y half.
    pub fn top_half(&self) -> Aabb {
        Aabb { min: Vec3::new(self.min.x, self.center().y, self.min.z), max: self.max }
    }

    /// Lower-z half.
    pub fn back_half(&self) -> Aabb {
        Aabb { min: self.min, max: Vec3::new(self.max.x, self.max.y, self.center().z) }
    }

    /// Upper-z half.
    pub fn front_half(&self) -> Aabb {
        Aabb { min: Vec3::new(self.min.x, self.min.y, self.center().z), max: self.max }
    }

    /// One of the 8 octants, using the same bit layout as [`Aabb::corner`].
    pub fn octant(&self, index: usize) -> Aabb {
        assert!(index < 8, "Aabb octant index {index} out of range 0..8");
        let x = if index & 1 == 0 { self.left_half() } else { self.right_half() };
        let xy = if index & 2 == 0 { x.bottom_half() } else { x.top_half() };
        if index & 4 == 0 {
            xy.back_half()
        } else {
            xy.front_half()
        }
    }

    /// Classify `other` against this box.
    ///
    /// Separating-axis rejection first, then full containment, otherwise a
    /// partial overlap.
    pub fn classify(&self, other: &Aabb) -> Containment {
        if self.is_empty() || other.is_empty() {
            return Containment::NoOverlap;
        }
        if other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y
            || other.max.z < self.min.z
            || other.min.z > self.max.z
        {
            return Containment::NoOverlap;
        }
        if self.min.cmple(other.min).all() && other.max.cmple(self.max).all() {
            Containment::Contains
        } else {
            Containment::Intersects
        }
    }

    /// Shorthand for `classify(other) == Containment::Contains`.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.classify(other) == Containment::Contains
    }

    /// Bound of this box after an arbitrary affine transform.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        matrix.transform_aabb(self)
    }

    /// Slab test. Returns the parameter at which the ray enters the box,
    /// clamped to the ray's window start when the origin is inside.
    ///
    /// Zero direction components give infinite inverses. A `NaN` from
    /// `0 * inf` means the origin sits on a slab plane while the ray runs
    /// parallel to it; that axis then does not restrict the interval.
    pub fn ray_intersection(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() || ray.is_degenerate() {
            return None;
        }

        let mut t_enter = ray.t_min();
        let mut t_exit = ray.t_max();

        for axis in 0..3 {
            let inv = ray.inv_direction[axis];
            let t0 = (self.min[axis] - ray.origin[axis]) * inv;
            let t1 = (self.max[axis] - ray.origin[axis]) * inv;
            if t0.is_nan() || t1.is_nan() {
                continue;
            }

            t_enter = t_enter.max(t0.min(t1));
            t_exit = t_exit.min(t0.max(t1));
            if t_exit < t_enter {
                return None;
            }
        }

        Some(t_enter)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::splat(10.0));
    }

    #[test]
    fn test_encompass_point_contains_and_grows() {
        let mut aabb = unit_box();
        let points = [
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(0.0, -4.0, 2.0),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-7.0, 9.0, -2.0),
        ];

        for p in points {
            let before = aabb.volume();
            aabb.encompass_point(p);
            assert!(aabb.contains_point(p));
            assert!(aabb.volume() >= before);
        }
    }

    #[test]
    fn test_encompass_from_empty() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        aabb.encompass_point(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb, Aabb::from_point(Vec3::new(1.0, 2.0, 3.0)));

        aabb.encompass(&Aabb::EMPTY);
        assert_eq!(aabb.volume(), 0.0);
    }

    #[test]
    fn test_classify() {
        let outer = Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0));
        let inner = unit_box();
        let straddle = Aabb::new(Vec3::splat(5.0), Vec3::splat(15.0));
        let far = Aabb::new(Vec3::splat(20.0), Vec3::splat(30.0));

        assert_eq!(outer.classify(&inner), Containment::Contains);
        assert_eq!(inner.classify(&outer), Containment::Intersects);
        assert_eq!(outer.classify(&straddle), Containment::Intersects);
        assert_eq!(outer.classify(&far), Containment::NoOverlap);
        assert_eq!(far.classify(&outer), Containment::NoOverlap);
    }

    #[test]
    fn test_classify_is_symmetric_only_for_equal_boxes() {
        let a = unit_box();
        let b = unit_box();
        assert_eq!(a.classify(&b), Containment::Contains);
        assert_eq!(b.classify(&a), Containment::Contains);

        let smaller = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        assert_eq!(a.classify(&smaller), Containment::Contains);
        assert_eq!(smaller.classify(&a), Containment::Intersects);
    }

    #[test]
    fn test_octants_tile_parent() {
        let parent = Aabb::new(Vec3::splat(-10.0), Vec3::splat(10.0));
        let mut total = 0.0;
        for i in 0..8 {
            let octant = parent.octant(i);
            assert!(parent.contains(&octant));
            assert!((octant.volume() - 1000.0).abs() < 1e-3);
            assert_eq!(octant.corner(i), parent.corner(i));
            total += octant.volume();
        }
        assert!((total - parent.volume()).abs() < 1e-2);
    }

    #[test]
    fn test_halves() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(aabb.left_half().max.x, 1.0);
        assert_eq!(aabb.right_half().min.x, 1.0);
        assert_eq!(aabb.bottom_half().max.y, 2.0);
        assert_eq!(aabb.top_half().min.y, 2.0);
        assert_eq!(aabb.back_half().max.z, 3.0);
        assert_eq!(aabb.front_half().min.z, 3.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_corner_out_of_range_panics() {
        unit_box().corner(8);
    }

    #[test]
    fn test_transformed_rotation_uses_all_corners() {
        let aabb = unit_box();
        let rotated = aabb.transformed(&Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let expected = 2.0_f32.sqrt();

        assert!((rotated.max.x - expected).abs() < 1e-4);
        assert!((rotated.min.z + expected).abs() < 1e-4);
        assert!((rotated.max.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_aabb_ray_intersection() {
        let aabb = unit_box();

        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = aabb.ray_intersection(&ray).expect("ray aimed at box");
        assert!((t - 4.0).abs() < 1e-5);

        // Pointing away
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z);
        assert!(aabb.ray_intersection(&ray).is_none());

        // Missing the box
        let ray = Ray::new(Vec3::new(10.0, 0.0, 0.0), Vec3::Z);
        assert!(aabb.ray_intersection(&ray).is_none());
    }

    #[test]
    fn test_ray_from_inside_enters_at_window_start() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let t = unit_box().ray_intersection(&ray).unwrap();
        assert_eq!(t, ray.t_min());
    }

    #[test]
    fn test_ray_on_slab_boundary_with_zero_component() {
        // Origin lies exactly on the x = 1 plane and direction.x == 0: 0 * inf = NaN.
        let ray = Ray::new(Vec3::new(1.0, 0.0, -5.0), Vec3::Z);
        assert!(unit_box().ray_intersection(&ray).is_some());
    }

    #[test]
    fn test_ray_window_rejects_far_box() {
        let ray = Ray::with_window(
            Vec3::new(0.0, 0.0, -5.0),
            Vec3::Z,
            crate::Interval::new(0.0, 3.0),
        );
        assert!(unit_box().ray_intersection(&ray).is_none());
    }
}
