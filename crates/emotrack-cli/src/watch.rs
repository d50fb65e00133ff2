//! Live mode: frames arrive on stdin as the detector produces them and the
//! session runs on wall-clock time. A frame's own `timestamp_ms` is ignored;
//! the session clock stamps every frame and also drives the fps meter.

use crate::engine::{EngineError, EngineHandle};
use anyhow::Result;
use emotrack_core::fps::FpsMeter;
use emotrack_core::theme::{Palette, ThemeSelector};
use emotrack_core::{
    AnalyticsConfig, DetectorFrame, Emotion, FrameResult, SessionSummary, TimelinePoint,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

/// Control messages accepted on the frame stream, e.g. `{"command":"calibrate"}`
/// or `{"command":{"timeline":{"window_secs":30}}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Calibrate,
    ClearCalibration,
    Timeline { window_secs: u64 },
    /// Replace the live config. Omitted fields take their defaults.
    Configure(AnalyticsConfig),
}

#[derive(Debug, PartialEq)]
pub enum Input {
    Frame(DetectorFrame),
    Command(Command),
}

pub fn parse_input(line: &str) -> Result<Input, serde_json::Error> {
    let mut value: serde_json::Value = serde_json::from_str(line)?;
    if let Some(command) = value.get_mut("command") {
        return Ok(Input::Command(serde_json::from_value(command.take())?));
    }
    Ok(Input::Frame(serde_json::from_value(value)?))
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    Frame {
        fps: f64,
        result: &'a FrameResult,
    },
    Theme {
        emotion: Option<Emotion>,
        palette: &'static Palette,
    },
    Calibrated {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Timeline {
        points: &'a [TimelinePoint],
    },
    Tick {
        fps: f64,
        summary: &'a SessionSummary,
    },
    Final {
        summary: &'a SessionSummary,
    },
}

fn emit(out: &mut impl Write, event: &Event<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, event)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub tick: Duration,
    pub emit_frames: bool,
    pub theme: bool,
}

struct Watcher<W> {
    handle: EngineHandle,
    out: W,
    fps: FpsMeter,
    theme: ThemeSelector,
    emit_frames: bool,
}

impl<W: Write> Watcher<W> {
    async fn handle_line(&mut self, line: &str) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let input = match parse_input(line) {
            Ok(input) => input,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed input line");
                return Ok(());
            }
        };

        match input {
            Input::Command(Command::Calibrate) => {
                let event = match self.handle.calibrate().await {
                    Ok(()) => Event::Calibrated { ok: true, error: None },
                    Err(EngineError::Session(e)) => {
                        tracing::warn!(error = %e, "calibration refused");
                        Event::Calibrated {
                            ok: false,
                            error: Some(e.to_string()),
                        }
                    }
                    Err(e) => return Err(e.into()),
                };
                emit(&mut self.out, &event)?;
            }
            Input::Command(Command::ClearCalibration) => {
                self.handle.clear_calibration().await?;
            }
            Input::Command(Command::Timeline { window_secs }) => {
                let points = self.handle.timeline(window_secs).await?;
                emit(&mut self.out, &Event::Timeline { points: &points })?;
            }
            Input::Command(Command::Configure(config)) => match self.handle.update_config(config).await {
                Ok(()) => {}
                Err(EngineError::Config(e)) => tracing::warn!(error = %e, "config update rejected"),
                Err(e) => return Err(e.into()),
            },
            Input::Frame(frame) => {
                let Some(result) = self.handle.process(frame.faces).await? else {
                    return Ok(());
                };
                let fps = self.fps.record(result.timestamp_ms);
                if self.emit_frames {
                    emit(&mut self.out, &Event::Frame { fps, result: &result })?;
                }
                if let Some(palette) = self.theme.observe(&result) {
                    emit(
                        &mut self.out,
                        &Event::Theme {
                            emotion: result.dominant_emotion,
                            palette,
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        let summary = self.handle.summary().await?;
        emit(
            &mut self.out,
            &Event::Tick {
                fps: self.fps.fps(),
                summary: &summary,
            },
        )
    }
}

/// Run until stdin closes or Ctrl-C, then end the session and print the
/// final summary.
pub async fn run<W: Write>(handle: EngineHandle, out: W, opts: WatchOptions) -> Result<SessionSummary> {
    let mut theme = ThemeSelector::default();
    theme.set_enabled(opts.theme);
    let mut watcher = Watcher {
        handle,
        out,
        fps: FpsMeter::default(),
        theme,
        emit_frames: opts.emit_frames,
    };

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(opts.tick);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => watcher.handle_line(&line).await?,
                None => {
                    tracing::info!("input closed");
                    break;
                }
            },
            _ = ticker.tick() => watcher.tick().await?,
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    let summary = watcher.handle.end().await?;
    emit(&mut watcher.out, &Event::Final { summary: &summary })?;
    Ok(summary)
}
