//! 3-D Axis Aligned Bounding Boxes.

use crate::geometry::*;
use crate::pbrt::*;
use num_traits::bounds::Bounded;
use num_traits::Num;

/// 3-D Axis Aligned Bounding Box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3<T> {
    /// Minimum bounds.
    pub p_min: Point3<T>,

    /// Maximum bounds.
    pub p_max: Point3<T>,
}

/// 3-D bounding box containing `Float` points.
pub type Bounds3f = Bounds3<Float>;

impl<T: Num + PartialOrd + Copy> Bounds3<T> {
    /// Creates a new 3-D bounding box from 2 points. The minimum and maximum
    /// bounds are used for each coordinate axis.
    ///
    /// * `p1` - First point.
    /// * `p2` - Second point.
    pub fn new(p1: Point3<T>, p2: Point3<T>) -> Self {
        Self {
            p_min: p1.min(&p2),
            p_max: p1.max(&p2),
        }
    }

    /// Returns a 3-D bounding box where minimum and maximum bounds are maximum
    /// and minimum values respectively of the type's limits. This is so we can
    /// easily grow the bounding box from nothing iteratively.
    pub fn empty() -> Self
    where
        T: Bounded,
    {
        Self {
            p_min: Point3::new(T::max_value(), T::max_value(), T::max_value()),
            p_max: Point3::new(T::min_value(), T::min_value(), T::min_value()),
        }
    }

    /// Returns true if the bounds describes an empty box where any of the
    /// components of p_max are less than p_min.
    pub fn is_empty(&self) -> bool {
        self.p_max.x < self.p_min.x || self.p_max.y < self.p_min.y || self.p_max.z < self.p_min.z
    }

    /// Returns the vector along the box diagonal from the minimum point to
    /// the maximum point.
    pub fn diagonal(&self) -> Vector3<T> {
        self.p_max - self.p_min
    }

    /// Returns the index of which of the axes is longest.
    pub fn maximum_extent(&self) -> Axis {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            Axis::X
        } else if d.y > d.z {
            Axis::Y
        } else {
            Axis::Z
        }
    }

    /// Returns true if a point is inside the bounding box.
    ///
    /// * `p` - The point.
    pub fn contains(&self, p: &Point3<T>) -> bool {
        (p.x >= self.p_min.x && p.x <= self.p_max.x)
            && (p.y >= self.p_min.y && p.y <= self.p_max.y)
            && (p.z >= self.p_min.z && p.z <= self.p_max.z)
    }

    /// Pads the bounding box by a constant factor in all dimensions.
    ///
    /// * `delta` - Padding amount.
    pub fn expand(&self, delta: T) -> Self {
        let d = Vector3::new(delta, delta, delta);
        Self {
            p_min: self.p_min - d,
            p_max: self.p_max + d,
        }
    }
}

impl Bounds3f {
    /// Returns the squared distance from a point to the closest point of the
    /// box. Zero when the point is inside.
    ///
    /// * `p` - The point.
    pub fn distance_squared(&self, p: &Point3f) -> Float {
        let dx = max(0.0, max(self.p_min.x - p.x, p.x - self.p_max.x));
        let dy = max(0.0, max(self.p_min.y - p.y, p.y - self.p_max.y));
        let dz = max(0.0, max(self.p_min.z - p.z, p.z - self.p_max.z));
        dx * dx + dy * dy + dz * dz
    }
}

impl<T: Num + PartialOrd + Copy> From<Point3<T>> for Bounds3<T> {
    /// Use a 3-D point as minimum and maximum 3-D bounds.
    ///
    /// * `p` - 3-D point.
    fn from(p: Point3<T>) -> Self {
        Self { p_min: p, p_max: p }
    }
}

impl<T: Num + PartialOrd + Copy> Union<Point3<T>> for Bounds3<T> {
    /// Return a bounding box that encloses this box and a point.
    ///
    /// * `p` - The point.
    fn union(&self, p: &Point3<T>) -> Self {
        Self {
            p_min: self.p_min.min(p),
            p_max: self.p_max.max(p),
        }
    }
}

impl<T: Num + PartialOrd + Copy> Union<Bounds3<T>> for Bounds3<T> {
    /// Return a bounding box that encloses both boxes.
    ///
    /// * `other` - The other box.
    fn union(&self, other: &Bounds3<T>) -> Self {
        Self {
            p_min: self.p_min.min(&other.p_min),
            p_max: self.p_max.max(&other.p_max),
        }
    }
}

impl<T: Num + PartialOrd + Copy + Bounded> Default for Bounds3<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::*;
    use proptest::prelude::*;

    prop_point3!(
        point3_f32,
        f32,
        -100.0..100.0f32,
        -100.0..100.0f32,
        -100.0..100.0f32
    );

    #[test]
    fn empty_bounds_grow_to_point() {
        let b = Bounds3f::empty();
        assert!(b.is_empty());
        let p = Point3f::new(1.0, 2.0, 3.0);
        let b = b.union(&p);
        assert!(!b.is_empty());
        assert_eq!(b.p_min, p);
        assert_eq!(b.p_max, p);
    }

    #[test]
    fn maximum_extent() {
        let b = Bounds3f::new(Point3f::zero(), Point3f::new(1.0, 5.0, 2.0));
        assert_eq!(b.maximum_extent(), Axis::Y);
    }

    #[test]
    fn distance_squared_outside_and_inside() {
        let b = Bounds3f::new(Point3f::zero(), Point3f::new(1.0, 1.0, 1.0));
        assert_eq!(b.distance_squared(&Point3f::new(0.5, 0.5, 0.5)), 0.0);
        assert!(approx_eq!(
            f32,
            b.distance_squared(&Point3f::new(3.0, 1.0, -1.0)),
            5.0,
            epsilon = 1e-6
        ));
    }

    proptest! {
        #[test]
        fn union_contains_inputs(p1 in point3_f32(), p2 in point3_f32(), p3 in point3_f32()) {
            let b = Bounds3f::new(p1, p2).union(&p3);
            prop_assert!(b.contains(&p1));
            prop_assert!(b.contains(&p2));
            prop_assert!(b.contains(&p3));
        }

        #[test]
        fn box_distance_never_exceeds_point_distance(
            p1 in point3_f32(),
            p2 in point3_f32(),
            q in point3_f32()
        ) {
            let b = Bounds3f::new(p1, p2);
            prop_assert!(b.distance_squared(&q) <= q.distance_squared(&p1) + 1e-2);
            prop_assert!(b.distance_squared(&q) <= q.distance_squared(&p2) + 1e-2);
        }
    }
}
