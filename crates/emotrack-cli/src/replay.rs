//! Offline replay of a recorded detector stream (one JSON frame per line).
//!
//! Time comes from the frames themselves, so replaying a file twice gives
//! identical output.

use anyhow::Result;
use clap::ValueEnum;
use emotrack_core::{AnalyticsConfig, DetectorFrame, ManualClock, Session, SessionSummary};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// One FrameResult per input frame.
    Frames,
    /// Final session summary.
    Summary,
    /// Final emotion timeline.
    Timeline,
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Spacing assumed for frames without `timestamp_ms`.
    pub frame_interval_ms: i64,
    /// Calibrate right after this many frames have been processed.
    pub calibrate_at: Option<u64>,
    pub window_secs: u64,
    pub emit: Emit,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            calibrate_at: None,
            window_secs: 60,
            emit: Emit::Summary,
        }
    }
}

pub fn run<R: BufRead, W: Write>(
    config: AnalyticsConfig,
    input: R,
    out: &mut W,
    opts: &ReplayOptions,
) -> Result<SessionSummary> {
    let clock = ManualClock::new(0);
    let mut session = Session::with_clock(config, clock.clone())?;
    let mut last_ts: Option<i64> = None;
    let mut processed = 0u64;

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: DetectorFrame = match serde_json::from_str(&line) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed frame");
                continue;
            }
        };

        let ts = frame
            .timestamp_ms
            .unwrap_or_else(|| last_ts.map_or(0, |t| t + opts.frame_interval_ms));
        last_ts = Some(ts);
        clock.set(ts);
        if !session.is_active() {
            session.start();
        }

        let Some(result) = session.process_frame(&frame.faces) else {
            continue;
        };
        processed += 1;

        if opts.calibrate_at == Some(processed) {
            match session.calibrate() {
                Ok(()) => tracing::info!(frame = processed, "calibrated"),
                Err(e) => tracing::warn!(frame = processed, error = %e, "calibration failed"),
            }
        }

        if opts.emit == Emit::Frames {
            serde_json::to_writer(&mut *out, &result)?;
            writeln!(out)?;
        }
    }

    if !session.is_active() {
        session.start();
    }
    session.end();
    let summary = session.summary();
    tracing::info!(
        frames = summary.frames_analyzed,
        with_face = summary.frames_with_face,
        "replay finished"
    );

    match opts.emit {
        Emit::Frames => {}
        Emit::Summary => {
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
        }
        Emit::Timeline => {
            serde_json::to_writer_pretty(&mut *out, &session.timeline(opts.window_secs))?;
            writeln!(out)?;
        }
    }
    Ok(summary)
}
