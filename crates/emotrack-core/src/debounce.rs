//! Two-state event detectors: blink (EAR), yawn (MAR) and look-away (gaze).
//!
//! Each detector thresholds a scalar into an active/inactive state and counts
//! a completed event on the active→inactive edge: a blink when the eye
//! reopens, a yawn when the mouth closes, a look-away when gaze leaves the
//! camera. There is a single threshold per detector and no hysteresis band,
//! so input straddling the threshold counts one event per crossing pair.

/// EAR below this reads as a closed eye.
pub const EAR_CLOSED_THRESHOLD: f32 = 0.2;
/// MAR above this reads as an open (yawning) mouth.
pub const MAR_OPEN_THRESHOLD: f32 = 0.6;
/// Gaze deviation at or above this reads as looking away.
pub const GAZE_AWAY_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Default)]
struct EdgeLatch {
    active: bool,
    completions: u32,
}

impl EdgeLatch {
    /// Returns true when this sample completes an event.
    fn update(&mut self, active: bool) -> bool {
        let completed = self.active && !active;
        if completed {
            self.completions += 1;
        }
        self.active = active;
        completed
    }
}

/// Eye open/closed detector. Starts open.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f32,
    latch: EdgeLatch,
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(EAR_CLOSED_THRESHOLD)
    }
}

impl BlinkDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            latch: EdgeLatch::default(),
        }
    }

    /// Feed one EAR sample; returns whether the eye is currently closed.
    pub fn update(&mut self, ear: f32) -> bool {
        let closed = ear < self.threshold;
        if self.latch.update(closed) {
            tracing::debug!(ear, count = self.latch.completions, "blink completed");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.latch.active
    }

    pub fn blink_count(&self) -> u32 {
        self.latch.completions
    }
}

/// Mouth open/closed detector. Starts closed.
#[derive(Debug, Clone)]
pub struct YawnDetector {
    threshold: f32,
    latch: EdgeLatch,
}

impl Default for YawnDetector {
    fn default() -> Self {
        Self::new(MAR_OPEN_THRESHOLD)
    }
}

impl YawnDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            latch: EdgeLatch::default(),
        }
    }

    /// Feed one MAR sample; returns whether the mouth is currently open.
    pub fn update(&mut self, mar: f32) -> bool {
        let open = mar > self.threshold;
        if self.latch.update(open) {
            tracing::debug!(mar, count = self.latch.completions, "yawn completed");
        }
        open
    }

    pub fn is_open(&self) -> bool {
        self.latch.active
    }

    pub fn yawn_count(&self) -> u32 {
        self.latch.completions
    }
}

/// Looking/away detector with attention-time accrual. Starts "not looking".
///
/// Between consecutive samples, the elapsed wall-clock time is credited as
/// attention when the earlier sample was looking.
#[derive(Debug, Clone)]
pub struct GazeTracker {
    threshold: f32,
    latch: EdgeLatch,
    attention_ms: i64,
    last_sample_ms: Option<i64>,
}

impl Default for GazeTracker {
    fn default() -> Self {
        Self::new(GAZE_AWAY_THRESHOLD)
    }
}

impl GazeTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            latch: EdgeLatch::default(),
            attention_ms: 0,
            last_sample_ms: None,
        }
    }

    /// Feed one gaze-deviation sample taken at `now_ms`; returns whether the
    /// face is looking at the camera.
    pub fn update(&mut self, deviation: f32, now_ms: i64) -> bool {
        if let Some(last) = self.last_sample_ms {
            if self.latch.active {
                self.attention_ms += (now_ms - last).max(0);
            }
        }
        self.last_sample_ms = Some(now_ms);

        let looking = deviation < self.threshold;
        if self.latch.update(looking) {
            tracing::debug!(deviation, count = self.latch.completions, "looked away");
        }
        looking
    }

    pub fn is_looking(&self) -> bool {
        self.latch.active
    }

    pub fn look_away_count(&self) -> u32 {
        self.latch.completions
    }

    /// Total milliseconds credited as looking at the camera.
    pub fn attention_ms(&self) -> i64 {
        self.attention_ms
    }
}
