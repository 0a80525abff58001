//! Buffer geometry: vertex attributes plus an optional triangle index buffer

use crate::bounds::Aabb;
use crate::point::{Point3f, Uv, Vector3f};
use crate::transform::ObjectTransform;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default tolerance used when merging duplicate vertices
pub const MERGE_TOLERANCE: f32 = 1e-4;

/// Portion of the element buffer that is drawn.
///
/// Elements are indices for indexed geometry and vertices otherwise.
/// `count: None` draws everything from `start` to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DrawRange {
    pub start: usize,
    pub count: Option<usize>,
}

impl DrawRange {
    pub const ALL: DrawRange = DrawRange { start: 0, count: None };

    pub fn new(start: usize, count: usize) -> Self {
        Self {
            start,
            count: Some(count),
        }
    }

    /// Clamp this range against a buffer of `len` elements
    pub fn resolve(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.start.min(len);
        let end = match self.count {
            Some(count) => start.saturating_add(count).min(len),
            None => len,
        };
        start..end
    }
}

/// Triangle geometry stored as flat attribute buffers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BufferGeometry {
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
    pub uvs: Option<Vec<Uv>>,
    pub index: Option<Vec<u32>>,
    pub draw_range: DrawRange,
}

impl BufferGeometry {
    /// Create a non-indexed geometry where every three positions form a triangle
    pub fn from_positions(positions: Vec<Point3f>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    /// Create an indexed geometry
    pub fn indexed(positions: Vec<Point3f>, index: Vec<u32>) -> Self {
        Self {
            positions,
            index: Some(index),
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vector3f>) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn with_uvs(mut self, uvs: Vec<Uv>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of elements (indices or vertices) addressed by the draw range
    pub fn element_count(&self) -> usize {
        let len = match &self.index {
            Some(index) => index.len(),
            None => self.positions.len(),
        };
        self.draw_range.resolve(len).len()
    }

    /// Number of whole triangles addressed by the draw range
    pub fn triangle_count(&self) -> usize {
        self.element_count() / 3
    }

    /// Triangles addressed by the draw range, as vertex indices
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        match &self.index {
            Some(index) => index[self.draw_range.resolve(index.len())]
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .collect(),
            None => {
                let range = self.draw_range.resolve(self.positions.len());
                let start = range.start as u32;
                (0..range.len() as u32 / 3)
                    .map(|t| {
                        let base = start + t * 3;
                        [base, base + 1, base + 2]
                    })
                    .collect()
            }
        }
    }

    /// Bounds of all positions, regardless of index buffer and draw range
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.positions.iter())
    }

    /// Check attribute lengths and index ranges
    pub fn validate(&self) -> Result<()> {
        let n = self.positions.len();
        if let Some(normals) = &self.normals {
            if normals.len() != n {
                return Err(Error::InvalidGeometry(format!(
                    "normal count {} does not match position count {}",
                    normals.len(),
                    n
                )));
            }
        }
        if let Some(uvs) = &self.uvs {
            if uvs.len() != n {
                return Err(Error::InvalidGeometry(format!(
                    "uv count {} does not match position count {}",
                    uvs.len(),
                    n
                )));
            }
        }
        match &self.index {
            Some(index) => {
                if index.len() % 3 != 0 {
                    return Err(Error::InvalidGeometry(format!(
                        "index count {} is not a multiple of 3",
                        index.len()
                    )));
                }
                if let Some(bad) = index.iter().find(|&&i| i as usize >= n) {
                    return Err(Error::InvalidGeometry(format!(
                        "index {} out of range for {} vertices",
                        bad, n
                    )));
                }
            }
            None => {
                if n % 3 != 0 {
                    return Err(Error::InvalidGeometry(format!(
                        "non-indexed vertex count {} is not a multiple of 3",
                        n
                    )));
                }
            }
        }
        Ok(())
    }

    /// Merge vertices whose attributes are equal after quantising to
    /// `tolerance`, producing an indexed geometry.
    ///
    /// Every present attribute takes part in the comparison, so vertices
    /// that share a position but differ in normal or uv stay separate.
    /// The first occurrence of each unique vertex keeps its exact values.
    pub fn merge_vertices(&self, tolerance: f32) -> BufferGeometry {
        let multiplier = 1.0 / tolerance.max(f32::EPSILON) as f64;
        let quantize = |v: f32| (v as f64 * multiplier).round() as i64;

        let elements: Vec<u32> = match &self.index {
            Some(index) => index.clone(),
            None => (0..self.positions.len() as u32).collect(),
        };

        let mut lookup: HashMap<Vec<i64>, u32> = HashMap::with_capacity(elements.len());
        let mut positions = Vec::new();
        let mut normals = self.normals.as_ref().map(|_| Vec::new());
        let mut uvs = self.uvs.as_ref().map(|_| Vec::new());
        let mut index = Vec::with_capacity(elements.len());

        for &element in &elements {
            let v = element as usize;
            let mut key = Vec::with_capacity(8);
            let p = self.positions[v];
            key.extend([quantize(p.x), quantize(p.y), quantize(p.z)]);
            if let Some(src) = &self.normals {
                let n = src[v];
                key.extend([quantize(n.x), quantize(n.y), quantize(n.z)]);
            }
            if let Some(src) = &self.uvs {
                let uv = src[v];
                key.extend([quantize(uv[0]), quantize(uv[1])]);
            }

            let next = positions.len() as u32;
            let merged = *lookup.entry(key).or_insert(next);
            if merged == next {
                positions.push(p);
                if let (Some(dst), Some(src)) = (normals.as_mut(), &self.normals) {
                    dst.push(src[v]);
                }
                if let (Some(dst), Some(src)) = (uvs.as_mut(), &self.uvs) {
                    dst.push(src[v]);
                }
            }
            index.push(merged);
        }

        BufferGeometry {
            positions,
            normals,
            uvs,
            index: Some(index),
            draw_range: DrawRange::ALL,
        }
    }

    /// Return an indexed version of this geometry, merging duplicate
    /// vertices when no index buffer exists yet
    pub fn into_indexed(self) -> BufferGeometry {
        if self.is_indexed() {
            self
        } else {
            self.merge_vertices(MERGE_TOLERANCE)
        }
    }

    /// Copy of this geometry with positions and normals moved into the
    /// space described by `transform`
    pub fn transformed(&self, transform: &ObjectTransform) -> BufferGeometry {
        let mut out = self.clone();
        for p in &mut out.positions {
            *p = transform.transform_point(p);
        }
        if let Some(normals) = &mut out.normals {
            for n in normals.iter_mut() {
                *n = transform.transform_normal(n);
            }
        }
        out
    }
}
