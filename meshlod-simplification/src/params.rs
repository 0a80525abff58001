//! Live simplification parameters

use crate::SimplifyOptions;
use serde::{Deserialize, Serialize};

/// Parameters driving the simplification of every geometry pair.
///
/// Values are clamped into range by the setters and by [`Self::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplificationParameters {
    /// Fraction of source indices to keep, in `[0, 1]`
    pub ratio: f32,
    /// Error tolerance relative to the mesh extent, in `[0, 0.25]`
    pub error: f32,
    /// Keep border vertices in place
    pub lock_border: bool,
}

impl SimplificationParameters {
    pub const RATIO_RANGE: (f32, f32) = (0.0, 1.0);
    pub const RATIO_STEP: f32 = 0.01;
    pub const ERROR_RANGE: (f32, f32) = (0.0, 0.25);
    pub const ERROR_STEP: f32 = 0.0001;

    pub fn new(ratio: f32, error: f32, lock_border: bool) -> Self {
        Self {
            ratio,
            error,
            lock_border,
        }
        .clamped()
    }

    /// Keep every triangle
    pub fn full_detail() -> Self {
        Self::new(1.0, 0.0, true)
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = clamp(ratio, Self::RATIO_RANGE);
    }

    pub fn set_error(&mut self, error: f32) {
        self.error = clamp(error, Self::ERROR_RANGE);
    }

    pub fn set_lock_border(&mut self, lock_border: bool) {
        self.lock_border = lock_border;
    }

    /// Copy with every field forced into range. NaN falls back to the
    /// lower bound.
    pub fn clamped(self) -> Self {
        Self {
            ratio: clamp(self.ratio, Self::RATIO_RANGE),
            error: clamp(self.error, Self::ERROR_RANGE),
            lock_border: self.lock_border,
        }
    }

    pub fn options(&self) -> SimplifyOptions {
        if self.lock_border {
            SimplifyOptions::LOCK_BORDER
        } else {
            SimplifyOptions::empty()
        }
    }
}

impl Default for SimplificationParameters {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            error: 0.01,
            lock_border: true,
        }
    }
}

fn clamp(value: f32, (lo, hi): (f32, f32)) -> f32 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SimplificationParameters::default();
        assert_eq!(p.ratio, 1.0);
        assert_eq!(p.error, 0.01);
        assert!(p.lock_border);
        assert_eq!(p.options(), SimplifyOptions::LOCK_BORDER);
    }

    #[test]
    fn test_setters_clamp() {
        let mut p = SimplificationParameters::default();
        p.set_ratio(1.5);
        assert_eq!(p.ratio, 1.0);
        p.set_ratio(-0.5);
        assert_eq!(p.ratio, 0.0);
        p.set_error(0.5);
        assert_eq!(p.error, 0.25);
        p.set_error(f32::NAN);
        assert_eq!(p.error, 0.0);
        p.set_lock_border(false);
        assert_eq!(p.options(), SimplifyOptions::empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let p: SimplificationParameters = serde_json::from_str(r#"{"ratio": 0.5}"#).unwrap();
        assert_eq!(p.ratio, 0.5);
        assert_eq!(p.error, 0.01);
        assert!(p.lock_border);
    }

    #[test]
    fn test_new_clamps() {
        let p = SimplificationParameters::new(2.0, 1.0, false);
        assert_eq!(p, SimplificationParameters::new(1.0, 0.25, false));
        assert_eq!(SimplificationParameters::full_detail().error, 0.0);
    }
}
