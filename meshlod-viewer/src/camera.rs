//! Camera utilities for 3D visualization

use crate::config::CameraConfig;
use nalgebra::{Matrix4, Perspective3, Point3, UnitQuaternion, Vector3};

/// A perspective camera looking at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            fov,
            aspect_ratio,
            near,
            far,
        }
    }

    /// Camera on the +z axis looking at the origin
    pub fn from_config(config: &CameraConfig, aspect_ratio: f32) -> Self {
        Self::new(
            Point3::new(0.0, 0.0, config.initial_z),
            Point3::origin(),
            Vector3::y(),
            config.fov,
            aspect_ratio,
            config.near,
            config.far,
        )
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective =
            Perspective3::new(self.aspect_ratio, self.fov.to_radians(), self.near, self.far);
        perspective.into_inner()
    }

    pub fn look_at(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Update the aspect ratio after a resize. Zero sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Rotate the camera around the target: `horizontal` about the up axis,
    /// `vertical` about the camera's right axis (radians). The elevation is
    /// kept short of the poles.
    pub fn orbit(&mut self, horizontal: f32, vertical: f32) {
        let offset = self.position - self.target;
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            return;
        }
        let up = self.up.normalize();
        let yaw = UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(up), -horizontal);
        let mut direction = yaw * (offset / radius);

        let right = direction.cross(&up);
        if right.norm() > f32::EPSILON {
            let pitch = UnitQuaternion::from_axis_angle(&nalgebra::Unit::new_normalize(right), vertical);
            let pitched = pitch * direction;
            // Stay away from the poles where the view matrix degenerates
            if pitched.dot(&up).abs() < 0.999 {
                direction = pitched;
            }
        }
        self.position = self.target + direction * radius;
    }

    /// Move towards the target by `factor` of the current distance
    /// (negative values move away)
    pub fn zoom(&mut self, factor: f32) {
        let offset = self.position - self.target;
        let scaled = offset * (1.0 - factor);
        if scaled.norm() > self.near {
            self.position = self.target + scaled;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_config() {
        let camera = Camera::from_config(&CameraConfig::default(), 1.5);
        assert_eq!(camera.position, Point3::new(0.0, 0.0, 10.0));
        assert_eq!(camera.fov, 100.0);
        assert_eq!(camera.aspect_ratio, 1.5);
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::default();
        camera.orbit(0.5, 0.3);
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-4);
        assert!(camera.position.x.abs() > 0.1);
    }

    #[test]
    fn test_zoom_and_viewport() {
        let mut camera = Camera::default();
        camera.zoom(0.5);
        assert_relative_eq!(camera.distance(), 5.0, epsilon = 1e-5);
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect_ratio, 2.0);
        camera.set_viewport(0, 400);
        assert_eq!(camera.aspect_ratio, 2.0);
    }

    #[test]
    fn test_projection_uses_degrees() {
        let mut camera = Camera::default();
        camera.fov = 90.0;
        camera.aspect_ratio = 1.0;
        let m = camera.projection_matrix();
        // cot(45 deg) = 1
        assert_relative_eq!(m[(1, 1)], 1.0, epsilon = 1e-5);
    }
}
