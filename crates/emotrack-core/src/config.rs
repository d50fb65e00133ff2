//! Analytics configuration.
//!
//! Every field may be swapped on a live session; the new values apply from
//! the next processed frame.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for smoothing, stability and history retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// History retention window in seconds.
    pub history_duration_secs: u64,
    /// Minimum spacing between retained history entries, in milliseconds.
    pub timeline_resolution_ms: u64,
    /// EMA weight of the newest sample, in (0, 1]. Lower is smoother.
    pub smoothing_factor: f32,
    /// Consecutive frames with the same dominant channel before it is stable.
    pub stability_frames: u32,
    /// Detector score threshold. Passed through to the detector, unused here.
    pub min_confidence: f32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            history_duration_secs: 300,
            timeline_resolution_ms: 1000,
            smoothing_factor: 0.3,
            stability_frames: 5,
            min_confidence: 0.5,
        }
    }
}

impl AnalyticsConfig {
    /// Quick to react: light smoothing, short stability run.
    pub fn responsive() -> Self {
        Self {
            smoothing_factor: 0.6,
            stability_frames: 3,
            ..Default::default()
        }
    }

    /// Slow to react: heavy smoothing, long stability run.
    pub fn steady() -> Self {
        Self {
            smoothing_factor: 0.15,
            stability_frames: 10,
            ..Default::default()
        }
    }

    /// Parse a (possibly partial) TOML document; missing keys take defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(ConfigError::Invalid {
                field: "smoothing_factor",
                reason: format!("must be in (0, 1], got {}", self.smoothing_factor),
            });
        }
        if self.stability_frames == 0 {
            return Err(ConfigError::Invalid {
                field: "stability_frames",
                reason: "must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Invalid {
                field: "min_confidence",
                reason: format!("must be in [0, 1], got {}", self.min_confidence),
            });
        }
        Ok(())
    }

    pub fn retention_ms(&self) -> u64 {
        self.history_duration_secs.saturating_mul(1000)
    }
}
