//! Session lifecycle and the state every frame updates.
//!
//! A [`Session`] owns all tracking state exclusively. Frames are processed by
//! [`Session::process_frame`](crate::pipeline); read-only queries live in
//! [`crate::summary`].

use crate::calibration::Calibration;
use crate::clock::{Clock, SystemClock};
use crate::config::{AnalyticsConfig, ConfigError};
use crate::debounce::{BlinkDetector, GazeTracker, YawnDetector};
use crate::frequency::FrequencyTable;
use crate::history::History;
use crate::smoothing::EmaSmoother;
use crate::stability::StabilityTracker;
use crate::types::ExpressionVector;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no active session")]
    NotActive,
    #[error("no face detected in the latest frame")]
    NoFaceDetected,
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Lifecycle bookkeeping for one session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub id: Option<Uuid>,
    pub start_ms: Option<i64>,
    /// Set by `end`; queries after end measure up to here.
    pub end_ms: Option<i64>,
    /// First frame with at least one face. Latched once per session.
    pub first_detection_ms: Option<i64>,
    pub active: bool,
    pub total_frames: u64,
    pub frames_with_face: u64,
}

/// One analytics session over a stream of detector frames.
///
/// `Idle → Active → Idle`. Starting again discards everything from the
/// previous session; ending freezes state so it can still be queried.
pub struct Session<C: Clock = SystemClock> {
    pub(crate) clock: C,
    pub(crate) config: AnalyticsConfig,
    pub(crate) state: SessionState,
    pub(crate) smoother: EmaSmoother,
    pub(crate) calibration: Calibration,
    pub(crate) stability: StabilityTracker,
    pub(crate) frequency: FrequencyTable,
    pub(crate) blink: BlinkDetector,
    pub(crate) yawn: YawnDetector,
    pub(crate) gaze: GazeTracker,
    pub(crate) history: History,
    /// Smoothed primary-face vector of the latest frame, if it had a face.
    pub(crate) last_primary: Option<ExpressionVector>,
}

impl Session<SystemClock> {
    pub fn new(config: AnalyticsConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Session<C> {
    pub fn with_clock(config: AnalyticsConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            clock,
            smoother: EmaSmoother::new(config.smoothing_factor),
            stability: StabilityTracker::new(config.stability_frames),
            config,
            state: SessionState::default(),
            calibration: Calibration::default(),
            frequency: FrequencyTable::default(),
            blink: BlinkDetector::default(),
            yawn: YawnDetector::default(),
            gaze: GazeTracker::default(),
            history: History::default(),
            last_primary: None,
        })
    }

    /// Discard all session state. Configuration is kept.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
        self.smoother.reset();
        self.calibration.clear();
        self.stability.reset();
        self.frequency = FrequencyTable::default();
        self.blink = BlinkDetector::default();
        self.yawn = YawnDetector::default();
        self.gaze = GazeTracker::default();
        self.history.clear();
        self.last_primary = None;
    }

    /// Reset and begin a fresh session.
    pub fn start(&mut self) {
        self.reset();
        let id = Uuid::new_v4();
        self.state.id = Some(id);
        self.state.start_ms = Some(self.clock.now_ms());
        self.state.active = true;
        tracing::info!(session = %id, "session started");
    }

    /// Stop accepting frames. State stays queryable until the next start.
    pub fn end(&mut self) {
        if !self.state.active {
            return;
        }
        self.state.active = false;
        self.state.end_ms = Some(self.clock.now_ms());
        tracing::info!(
            session = ?self.state.id,
            frames = self.state.total_frames,
            frames_with_face = self.state.frames_with_face,
            "session ended"
        );
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Validate and apply a new configuration from the next frame on.
    pub fn update_config(&mut self, config: AnalyticsConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.smoother.set_alpha(config.smoothing_factor);
        self.stability.set_threshold(config.stability_frames);
        tracing::info!(
            smoothing_factor = config.smoothing_factor,
            stability_frames = config.stability_frames,
            timeline_resolution_ms = config.timeline_resolution_ms,
            history_duration_secs = config.history_duration_secs,
            "config updated"
        );
        self.config = config;
        Ok(())
    }

    /// Capture the primary face's current smoothed vector as the baseline.
    ///
    /// Refused when no session is active or the latest frame had no face.
    pub fn calibrate(&mut self) -> Result<(), SessionError> {
        if !self.state.active {
            return Err(SessionError::NotActive);
        }
        let vector = self.last_primary.ok_or(SessionError::NoFaceDetected)?;
        self.calibrate_with(&vector);
        Ok(())
    }

    /// Use `vector` as the baseline as-is.
    pub fn calibrate_with(&mut self, vector: &ExpressionVector) {
        self.calibration.calibrate(vector);
        tracing::info!(baseline = ?vector, "calibration complete");
    }

    pub fn clear_calibration(&mut self) {
        self.calibration.clear();
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn blink_count(&self) -> u32 {
        self.blink.blink_count()
    }

    pub fn yawn_count(&self) -> u32 {
        self.yawn.yawn_count()
    }

    pub fn look_away_count(&self) -> u32 {
        self.gaze.look_away_count()
    }

    pub fn attention_ms(&self) -> i64 {
        self.gaze.attention_ms()
    }
}
