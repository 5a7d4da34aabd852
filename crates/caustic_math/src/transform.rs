// Rigid transforms for scene nodes.
//
// A Transform keeps the forward matrix together with its inverse so that
// world -> local ray mapping never re-inverts per query.

use std::ops::Mul;

use glam::{Mat4, Vec3};

use crate::{Aabb, Ray};

/// An affine transform with a cached inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Mat4,
    inverse: Mat4,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        matrix: Mat4::IDENTITY,
        inverse: Mat4::IDENTITY,
    };

    /// Wrap a matrix. The matrix must be invertible.
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self {
            matrix,
            inverse: matrix.inverse(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// The inverse transform (swaps the cached matrices).
    pub fn inverse(&self) -> Transform {
        Transform {
            matrix: self.inverse,
            inverse: self.matrix,
        }
    }

    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }

    /// Directions ignore translation (w = 0).
    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.matrix.transform_vector3(vector)
    }

    /// Normals map through the inverse transpose and are re-normalized.
    #[inline]
    pub fn transform_normal(&self, normal: Vec3) -> Vec3 {
        self.inverse
            .transpose()
            .transform_vector3(normal)
            .normalize_or_zero()
    }

    /// Map a ray without renormalizing its direction, so hit distances are
    /// comparable in both spaces.
    pub fn transform_ray(&self, ray: &Ray) -> Ray {
        Ray::new(
            self.transform_point(ray.origin),
            self.transform_vector(ray.direction),
        )
    }

    /// Bounding box of the 8 transformed corners.
    pub fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::EMPTY;
        }
        let corners = aabb.corners();
        let first = self.transform_point(corners[0]);
        let (min, max) = corners[1..]
            .iter()
            .map(|&c| self.transform_point(c))
            .fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Aabb::from_points(min, max)
    }

    /// Element-wise comparison of the forward matrices.
    pub fn abs_diff_eq(&self, other: &Transform, tolerance: f32) -> bool {
        self.matrix.abs_diff_eq(other.matrix, tolerance)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `a * b` applies `b` first, then `a` (parent * child).
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            matrix: self.matrix * rhs.matrix,
            inverse: rhs.inverse * self.inverse,
        }
    }
}

/// Translation by (x, y, z).
pub fn translate(x: f32, y: f32, z: f32) -> Transform {
    let offset = Vec3::new(x, y, z);
    Transform {
        matrix: Mat4::from_translation(offset),
        inverse: Mat4::from_translation(-offset),
    }
}

/// Rotation about +x, in degrees.
pub fn rotate_x(degrees: f32) -> Transform {
    let m = Mat4::from_rotation_x(degrees.to_radians());
    Transform {
        matrix: m,
        inverse: m.transpose(),
    }
}

/// Rotation about +y, in degrees.
pub fn rotate_y(degrees: f32) -> Transform {
    let m = Mat4::from_rotation_y(degrees.to_radians());
    Transform {
        matrix: m,
        inverse: m.transpose(),
    }
}

/// Rotation about +z, in degrees.
pub fn rotate_z(degrees: f32) -> Transform {
    let m = Mat4::from_rotation_z(degrees.to_radians());
    Transform {
        matrix: m,
        inverse: m.transpose(),
    }
}

/// Yaw/pitch/roll rotation in degrees.
///
/// Positive yaw turns +z towards -x, positive pitch tilts +z upwards and roll
/// spins about +z. Applied as `Ry(-yaw) * Rx(-pitch) * Rz(roll)`.
pub fn rotate(yaw: f32, pitch: f32, roll: f32) -> Transform {
    rotate_y(-yaw) * rotate_x(-pitch) * rotate_z(roll)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_point_and_vector() {
        let t = translate(10.0, 20.0, 30.0);
        assert_eq!(t.transform_point(Vec3::ONE), Vec3::new(11.0, 21.0, 31.0));
        // Translation should NOT affect vectors (w=0)
        assert_eq!(t.transform_vector(Vec3::X), Vec3::X);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = translate(1.0, -2.0, 0.5) * rotate(30.0, -12.0, 5.0);
        let p = Vec3::new(5.0, 3.0, 2.0);
        let back = t.inverse().transform_point(t.transform_point(p));
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn test_composition_applies_right_first() {
        // rotate then translate
        let t = translate(1.0, 0.0, 0.0) * rotate_z(90.0);
        let p = t.transform_point(Vec3::X);
        assert!((p - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_positive_pitch_looks_up() {
        let forward = rotate(0.0, 10.0, 0.0).transform_vector(Vec3::Z);
        assert!(forward.y > 0.0);

        let down = rotate(0.0, -12.0, 0.0).transform_vector(Vec3::Z);
        assert!(down.y < 0.0);
    }

    #[test]
    fn test_normal_stays_unit_and_perpendicular() {
        let t = rotate(45.0, 20.0, 0.0) * translate(3.0, 0.0, 0.0);
        let n = t.transform_normal(Vec3::Y);
        let tangent = t.transform_vector(Vec3::X);
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.dot(tangent).abs() < 1e-5);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let moved = translate(5.0, 5.0, 5.0).transform_aabb(&aabb);
        assert!((moved.min() - Vec3::splat(5.0)).length() < 1e-5);
        assert!((moved.max() - Vec3::splat(6.0)).length() < 1e-5);
    }
}
