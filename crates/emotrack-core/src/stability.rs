use crate::types::Emotion;

/// Run-length counter over the primary face's dominant channel.
///
/// `None` (no dominant channel) is compared like any other value, so a run
/// of frames without a dominant channel can itself become stable.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    current: Option<Emotion>,
    run: u32,
    threshold: u32,
}

impl StabilityTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            current: None,
            run: 0,
            threshold,
        }
    }

    /// Advance the run with this frame's dominant channel; returns whether
    /// the run has reached the threshold.
    pub fn update(&mut self, dominant: Option<Emotion>) -> bool {
        if dominant == self.current {
            self.run += 1;
        } else {
            self.current = dominant;
            self.run = 1;
        }
        self.is_stable()
    }

    pub fn is_stable(&self) -> bool {
        self.run >= self.threshold
    }

    pub fn current(&self) -> Option<Emotion> {
        self.current
    }

    pub fn run_length(&self) -> u32 {
        self.run
    }

    pub fn set_threshold(&mut self, threshold: u32) {
        self.threshold = threshold;
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.run = 0;
    }
}
