//! 3-D Coordinate System

use crate::geometry::*;
use crate::pbrt::*;
use num_traits::Float as NumFloat;

/// A coordinate system containing 3 orthogonal vectors.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CoordinateSystem<T> {
    /// The first unit vector.
    pub v1: Vector3<T>,

    /// The second unit vector.
    pub v2: Vector3<T>,

    /// The third unit vector.
    pub v3: Vector3<T>,
}

impl<T: NumFloat> From<Vector3<T>> for CoordinateSystem<T> {
    /// Create a new coordinate system from a single unit vector.
    ///
    /// A second vector is constructed from the first by zeroing one of the
    /// coordinates and swapping the remaining 2 and negating one of them. The
    /// third is their cross product.
    ///
    /// * `v1` - The first unit vector to form part of the coordinate system.
    fn from(v1: Vector3<T>) -> Self {
        let v2 = if abs(v1.x) > abs(v1.y) {
            Vector3::new(-v1.z, T::zero(), v1.x) / (v1.x * v1.x + v1.z * v1.z).sqrt()
        } else {
            Vector3::new(T::zero(), v1.z, -v1.y) / (v1.y * v1.y + v1.z * v1.z).sqrt()
        };
        let v3 = v1.cross(&v2);
        Self { v1, v2, v3 }
    }
}

impl CoordinateSystem<Float> {
    /// Transforms a direction given in the local frame (where `v1` is the
    /// +z axis) to world space.
    ///
    /// * `local` - Local direction.
    pub fn local_to_world(&self, local: &Vector3f) -> Vector3f {
        self.v2 * local.x + self.v3 * local.y + self.v1 * local.z
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

    prop_vector3!(
        vector3_f32,
        f32,
        -1.0..1.0f32,
        -1.0..1.0f32,
        -1.0..1.0f32
    );

    proptest! {
        #[test]
        fn frame_is_orthonormal(v in vector3_f32().prop_filter("non-zero", |v| v.length() > 0.1)) {
            let cs = CoordinateSystem::from(v.normalize());
            prop_assert!(approx_eq!(f32, cs.v2.length(), 1.0, epsilon = 1e-4));
            prop_assert!(approx_eq!(f32, cs.v3.length(), 1.0, epsilon = 1e-4));
            prop_assert!(abs(cs.v1.dot(&cs.v2)) < 1e-4);
            prop_assert!(abs(cs.v1.dot(&cs.v3)) < 1e-4);
            prop_assert!(abs(cs.v2.dot(&cs.v3)) < 1e-4);
        }

        #[test]
        fn local_z_maps_to_v1(v in vector3_f32().prop_filter("non-zero", |v| v.length() > 0.1)) {
            let n = v.normalize();
            let cs = CoordinateSystem::from(n);
            let w = cs.local_to_world(&Vector3f::new(0.0, 0.0, 1.0));
            prop_assert!(approx_eq!(f32, w.dot(&n), 1.0, epsilon = 1e-4));
        }
    }
}
