//! emotrack-core — Real-time emotion and attentiveness tracking.
//!
//! Turns noisy per-frame face detector output (expression probabilities and
//! facial landmarks) into smoothed, debounced, time-aggregated session
//! metrics. Pure in-memory computation; detection itself is external.

pub mod calibration;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod fps;
pub mod frequency;
pub mod geometry;
pub mod history;
pub mod pipeline;
pub mod session;
pub mod smoothing;
pub mod stability;
pub mod summary;
pub mod theme;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnalyticsConfig, ConfigError};
pub use pipeline::{FaceResult, FrameResult};
pub use session::{Session, SessionError, SessionState};
pub use summary::{SessionSummary, TimelinePoint};
pub use types::{
    BoundingBox, DetectedFace, DetectorFrame, Emotion, ExpressionVector, Landmarks, Point,
    ValidationError,
};
