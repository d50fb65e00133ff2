use emotrack_core::{AnalyticsConfig, ConfigError};
use std::path::Path;
use std::str::FromStr;

/// Resolve the effective configuration: a TOML file if given, otherwise
/// `preset`, then `EMOTRACK_*` environment overrides.
pub fn resolve(path: Option<&Path>, preset: AnalyticsConfig) -> Result<AnalyticsConfig, ConfigError> {
    let base = match path {
        Some(p) => AnalyticsConfig::load(p)?,
        None => preset,
    };
    let config = apply_overrides(base, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Overlay values from `lookup` (normally the process environment).
/// Unparsable values are ignored with a warning.
pub fn apply_overrides(
    mut config: AnalyticsConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> AnalyticsConfig {
    config.history_duration_secs = env_or(
        &lookup,
        "EMOTRACK_HISTORY_DURATION_SECS",
        config.history_duration_secs,
    );
    config.timeline_resolution_ms = env_or(
        &lookup,
        "EMOTRACK_TIMELINE_RESOLUTION_MS",
        config.timeline_resolution_ms,
    );
    config.smoothing_factor = env_or(&lookup, "EMOTRACK_SMOOTHING_FACTOR", config.smoothing_factor);
    config.stability_frames = env_or(&lookup, "EMOTRACK_STABILITY_FRAMES", config.stability_frames);
    config.min_confidence = env_or(&lookup, "EMOTRACK_MIN_CONFIDENCE", config.min_confidence);
    config
}

fn env_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            default
        }
    }
}
