//! Axis-aligned bounding boxes

use crate::point::{Point3f, Vector3f};
use crate::transform::ObjectTransform;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box. A freshly created box is empty: `min` is
/// `+inf` and `max` is `-inf` so that the first expanded point defines it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Create an empty box
    pub fn empty() -> Self {
        Self {
            min: Point3f::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3f::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Create a box from explicit corners
    pub fn new(min: Point3f, max: Point3f) -> Self {
        Self { min, max }
    }

    /// Smallest box containing all points
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_by_point(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand_by_point(&mut self, p: &Point3f) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Center of the box, or the origin for an empty box
    pub fn center(&self) -> Point3f {
        if self.is_empty() {
            return Point3f::origin();
        }
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths of the box, zero for an empty box
    pub fn size(&self) -> Vector3f {
        if self.is_empty() {
            return Vector3f::zeros();
        }
        self.max - self.min
    }

    /// Largest edge length
    pub fn max_extent(&self) -> f32 {
        self.size().max()
    }

    /// Bounds of this box after applying `transform` to its eight corners
    pub fn transformed(&self, transform: &ObjectTransform) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Point3f::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_by_point(&transform.transform_point(&corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
