//! Object transforms driven by the manipulation controls

use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Translation, rotation and uniform scale of a scene object.
///
/// Points are transformed as `translation * rotation * scale * p`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: f32,
}

impl ObjectTransform {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: 1.0,
        }
    }

    /// Move the object by `offset` in world space
    pub fn translate(&mut self, offset: &Vector3<f32>) {
        self.translation += offset;
    }

    /// Rotate the object around its own origin by `axis_angle`
    /// (axis scaled by the angle in radians)
    pub fn rotate(&mut self, axis_angle: &Vector3<f32>) {
        self.rotation = UnitQuaternion::new(*axis_angle) * self.rotation;
    }

    /// Multiply the uniform scale. Non-positive factors are ignored.
    pub fn scale_by(&mut self, factor: f32) {
        if factor > 0.0 {
            self.scale *= factor;
        }
    }

    /// Homogeneous matrix of this transform
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Translation3::from(self.translation).to_homogeneous()
            * self.rotation.to_homogeneous()
            * Matrix4::new_scaling(self.scale)
    }

    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.rotation * (point.coords * self.scale) + self.translation)
    }

    /// Transform a surface normal. Uniform scale does not change directions,
    /// so only the rotation applies.
    pub fn transform_normal(&self, normal: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * normal
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f32) -> bool {
        (self.to_matrix() - Matrix4::identity()).norm() < epsilon
    }
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_identity() {
        let t = ObjectTransform::default();
        assert!(t.is_identity(1e-6));
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(t.transform_point(&p), p);
    }

    #[test]
    fn test_rotate_then_translate() {
        let mut t = ObjectTransform::identity();
        t.rotate(&Vector3::new(0.0, 0.0, FRAC_PI_2));
        t.translate(&Vector3::new(0.0, 0.0, 1.0));
        let p = t.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 1.0), epsilon = 1e-6);

        let via_matrix = t.to_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(via_matrix, p, epsilon = 1e-6);
    }

    #[test]
    fn test_scale_ignores_non_positive() {
        let mut t = ObjectTransform::identity();
        t.scale_by(2.0);
        t.scale_by(0.0);
        t.scale_by(-1.0);
        assert_eq!(t.scale, 2.0);
        let n = t.transform_normal(&Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(n, Vector3::new(0.0, 1.0, 0.0));
    }
}
