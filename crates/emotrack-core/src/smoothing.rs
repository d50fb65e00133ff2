//! Exponential moving average over the expression channels.

use crate::types::ExpressionVector;

/// Per-channel EMA state for the primary face.
///
/// The caller must invoke [`smooth`](Self::smooth) exactly once per frame;
/// a second call in the same frame applies the filter twice.
#[derive(Debug, Clone)]
pub struct EmaSmoother {
    alpha: f32,
    state: ExpressionVector,
}

impl EmaSmoother {
    /// `alpha` is the weight of the newest sample, in (0, 1].
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            state: ExpressionVector::default(),
        }
    }

    /// Blend each channel present in `raw` into the running state,
    /// `alpha * raw + (1 - alpha) * prior` with prior starting at 0, and
    /// return the smoothed values of those channels. Channels absent from
    /// `raw` keep their prior state.
    pub fn smooth(&mut self, raw: &ExpressionVector) -> ExpressionVector {
        let alpha = self.alpha;
        let out = raw.zip_with(&self.state, |curr, prev| alpha * curr + (1.0 - alpha) * prev);
        for (emotion, value) in out.iter() {
            self.state.set(emotion, value);
        }
        out
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Takes effect on the next [`smooth`](Self::smooth) call; state is kept.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    /// Every channel seen since the last reset, at its latest smoothed value.
    pub fn current(&self) -> &ExpressionVector {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = ExpressionVector::default();
    }
}
