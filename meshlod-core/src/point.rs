//! Point and vector aliases shared by every meshlod crate

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Texture coordinate pair
pub type Uv = [f32; 2];

/// Flatten positions into the `[x, y, z, x, y, z, ...]` layout used by
/// vertex buffers.
pub fn flatten_points(points: &[Point3f]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y, p.z]).collect()
}
