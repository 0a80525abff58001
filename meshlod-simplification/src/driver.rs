//! Simplification driver
//!
//! Recomputes the destination index buffer of every geometry pair in a model
//! from its immutable source and the current parameters.

use crate::{EdgeCollapseSimplifier, IndexSimplifier, SimplificationParameters};
use meshlod_core::{GeometryPair, Model, Result};
use rayon::prelude::*;
use tracing::debug;

/// Index count kept for `ratio`: the largest multiple of 3 not above
/// `ratio * source_index_count`
pub fn target_index_count(ratio: f32, source_index_count: usize) -> usize {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) } as f64;
    let triangles = (ratio * source_index_count as f64 / 3.0).floor() as usize;
    (triangles * 3).min(source_index_count - source_index_count % 3)
}

/// Outcome for one geometry pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub index: usize,
    pub name: String,
    pub source_count: usize,
    pub target_count: usize,
    /// Index count actually written
    pub count: usize,
    /// Achieved error relative to the mesh extent
    pub error: f32,
}

/// Outcome of one pass over a model, in pair order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimplificationReport {
    pub pairs: Vec<PairReport>,
}

impl SimplificationReport {
    pub fn total_count(&self) -> usize {
        self.pairs.iter().map(|p| p.count).sum()
    }

    pub fn total_source_count(&self) -> usize {
        self.pairs.iter().map(|p| p.source_count).sum()
    }

    pub fn max_error(&self) -> f32 {
        self.pairs.iter().map(|p| p.error).fold(0.0, f32::max)
    }
}

/// Applies an [`IndexSimplifier`] to every pair of a model
pub struct SimplificationDriver {
    simplifier: Box<dyn IndexSimplifier>,
}

impl SimplificationDriver {
    pub fn new(simplifier: Box<dyn IndexSimplifier>) -> Self {
        Self { simplifier }
    }

    /// Recompute every destination buffer of `model`.
    ///
    /// Pairs are processed in parallel; the call returns once all of them
    /// are written. Each pair gets its full index buffer before its draw
    /// count changes.
    pub fn simplify(
        &self,
        model: &mut Model,
        params: &SimplificationParameters,
    ) -> Result<SimplificationReport> {
        let params = params.clamped();
        let pairs = model
            .pairs_mut()
            .par_iter_mut()
            .map(|pair| self.simplify_pair(pair, &params))
            .collect::<Result<Vec<_>>>()?;
        Ok(SimplificationReport { pairs })
    }

    fn simplify_pair(
        &self,
        pair: &mut GeometryPair,
        params: &SimplificationParameters,
    ) -> Result<PairReport> {
        let source_count = pair.source_indices().len();
        let target_count = target_index_count(params.ratio, source_count);

        let result = self.simplifier.simplify(
            pair.source_indices(),
            pair.source_positions(),
            target_count,
            params.error,
            params.options(),
        )?;
        pair.apply_reduction(&result.indices)?;

        debug!(
            pair = pair.index(),
            target_count,
            count = result.indices.len(),
            error = result.error,
            "simplified geometry pair"
        );

        Ok(PairReport {
            index: pair.index(),
            name: pair.name().to_string(),
            source_count,
            target_count,
            count: result.indices.len(),
            error: result.error,
        })
    }
}

impl Default for SimplificationDriver {
    fn default() -> Self {
        Self::new(Box::new(EdgeCollapseSimplifier::new()))
    }
}

impl std::fmt::Debug for SimplificationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimplificationDriver").finish_non_exhaustive()
    }
}

/// Simplify `model` with the default edge collapse simplifier
pub fn simplify_model(
    model: &mut Model,
    params: &SimplificationParameters,
) -> Result<SimplificationReport> {
    SimplificationDriver::default().simplify(model, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SimplifyOptions, SimplifyResult};
    use meshlod_core::{Error, Point3f, TorusKnot};

    fn torus_model() -> Model {
        let knot = TorusKnot::new(5.0, 2.5, 48, 12).build();
        Model::from_geometries(vec![("knot", knot)]).unwrap()
    }

    #[test]
    fn test_target_index_count_is_multiple_of_three() {
        for n in [0usize, 1, 2, 3, 7, 99, 100, 3000, 3001] {
            for step in 0..=100 {
                let r = step as f32 / 100.0;
                let t = target_index_count(r, n);
                assert_eq!(t % 3, 0, "ratio {} count {}", r, n);
                assert!(t <= n, "ratio {} count {}", r, n);
            }
        }
        assert_eq!(target_index_count(1.0, 300), 300);
        assert_eq!(target_index_count(0.5, 300), 150);
        assert_eq!(target_index_count(0.5, 12), 6);
        assert_eq!(target_index_count(0.0, 300), 0);
        assert_eq!(target_index_count(f32::NAN, 300), 0);
    }

    #[test]
    fn test_full_ratio_keeps_source() {
        let mut model = torus_model();
        let report = simplify_model(&mut model, &SimplificationParameters::full_detail()).unwrap();
        let pair = &model.pairs()[0];
        assert_eq!(pair.destination_indices(), pair.source_indices());
        assert_eq!(report.total_count(), report.total_source_count());
        assert_eq!(report.max_error(), 0.0);
    }

    #[test]
    fn test_reduction_respects_target() {
        let mut model = torus_model();
        let params = SimplificationParameters::new(0.5, 0.25, true);
        let report = simplify_model(&mut model, &params).unwrap();
        let entry = &report.pairs[0];
        assert_eq!(entry.target_count, target_index_count(0.5, entry.source_count));
        assert!(entry.count < entry.source_count);
        assert_eq!(model.pairs()[0].draw_count(), entry.count);
        assert!(entry.error <= 0.25 + 1e-6);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut model = torus_model();
        let params = SimplificationParameters::new(0.3, 0.05, false);
        simplify_model(&mut model, &params).unwrap();
        let first = model.pairs()[0].destination_indices().to_vec();
        simplify_model(&mut model, &params).unwrap();
        assert_eq!(model.pairs()[0].destination_indices(), first.as_slice());
    }

    struct FailingSimplifier;

    impl IndexSimplifier for FailingSimplifier {
        fn simplify(
            &self,
            _indices: &[u32],
            _positions: &[Point3f],
            _target_index_count: usize,
            _target_error: f32,
            _options: SimplifyOptions,
        ) -> Result<SimplifyResult> {
            Err(Error::Algorithm("reduction failed".to_string()))
        }
    }

    #[test]
    fn test_simplifier_failure_leaves_pair_untouched() {
        let mut model = torus_model();
        let before = model.pairs()[0].destination_indices().to_vec();
        let driver = SimplificationDriver::new(Box::new(FailingSimplifier));
        assert!(driver
            .simplify(&mut model, &SimplificationParameters::default())
            .is_err());
        assert_eq!(model.pairs()[0].destination_indices(), before.as_slice());
    }
}
