//! Core data structures for meshlod
//!
//! This crate provides the geometry buffers the viewer displays, bounding
//! boxes, object transforms, and the source/destination geometry pairs the
//! simplification pipeline rewrites.

pub mod point;
pub mod bounds;
pub mod geometry;
pub mod pair;
pub mod primitives;
pub mod transform;
pub mod error;

pub use point::*;
pub use bounds::*;
pub use geometry::*;
pub use pair::*;
pub use primitives::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4, UnitQuaternion};
