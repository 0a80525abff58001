//! Mesh simplification for meshlod
//!
//! This crate reduces the index buffers of geometry pairs while keeping the
//! source vertex buffers untouched:
//! - [`EdgeCollapseSimplifier`]: quadric error edge collapse that only
//!   merges vertices, never moves them
//! - [`SimplificationParameters`]: the live ratio / error / border settings
//! - [`simplify_model`]: recomputes every destination buffer of a model

pub mod driver;
pub mod edge_collapse;
pub mod params;

pub use driver::*;
pub use edge_collapse::*;
pub use params::*;

use bitflags::bitflags;
use meshlod_core::{Point3f, Result};

bitflags! {
    /// Flags controlling index simplification
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SimplifyOptions: u32 {
        /// Never move vertices on the topological border (edges used by a
        /// single triangle)
        const LOCK_BORDER = 1 << 0;
    }
}

/// Reduced index buffer and the error it cost
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyResult {
    /// Triangle list referencing vertices of the input position buffer
    pub indices: Vec<u32>,
    /// Largest deviation introduced, relative to the mesh extent
    pub error: f32,
}

/// Reduce a triangle index buffer over a fixed vertex buffer
pub trait IndexSimplifier: Send + Sync {
    /// Simplify `indices` towards `target_index_count` entries without
    /// exceeding `target_error` (relative to the mesh extent, e.g. 0.01 is
    /// 1% deformation). May stop short of the target.
    fn simplify(
        &self,
        indices: &[u32],
        positions: &[Point3f],
        target_index_count: usize,
        target_error: f32,
        options: SimplifyOptions,
    ) -> Result<SimplifyResult>;
}
