//! Baseline capture and deviation-from-baseline scoring.

use crate::types::ExpressionVector;

/// Optional captured baseline. Without one, [`deviation`](Self::deviation)
/// is the identity.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    baseline: Option<ExpressionVector>,
}

impl Calibration {
    /// Store a copy of `vector` as the baseline, replacing any previous one.
    pub fn calibrate(&mut self, vector: &ExpressionVector) {
        self.baseline = Some(*vector);
    }

    pub fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn baseline(&self) -> Option<&ExpressionVector> {
        self.baseline.as_ref()
    }

    /// Per channel present in `vector`, `max(0, vector - baseline)`; a
    /// channel missing from the baseline counts as 0. Values below baseline
    /// read as no signal rather than negative signal.
    pub fn deviation(&self, vector: &ExpressionVector) -> ExpressionVector {
        match &self.baseline {
            Some(baseline) => vector.zip_with(baseline, |curr, base| (curr - base).max(0.0)),
            None => *vector,
        }
    }

    pub fn clear(&mut self) {
        self.baseline = None;
    }
}
