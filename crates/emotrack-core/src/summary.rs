//! Read-only session queries: duration, averages, timeline and summary.

use crate::clock::{span_ms, Clock};
use crate::session::Session;
use crate::types::Emotion;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One history entry re-based to seconds since session start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub time_secs: f64,
    pub emotion: Option<Emotion>,
    pub confidence: f32,
    pub face_count: usize,
}

/// Snapshot of a session's aggregate statistics. Percentages are rounded to
/// whole numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: Option<Uuid>,
    pub duration_secs: u64,
    /// Seconds from start to the first face, to one decimal.
    pub time_to_first_detection_secs: Option<f64>,
    pub most_frequent_emotion: Option<Emotion>,
    pub average_confidence: u32,
    pub frames_analyzed: u64,
    pub frames_with_face: u64,
    pub face_detection_rate: u32,
    pub blink_count: u32,
    pub yawn_count: u32,
    pub look_away_count: u32,
    pub attention_percent: u32,
    pub emotion_breakdown: BTreeMap<Emotion, u64>,
    pub is_calibrated: bool,
}

fn percent(ratio: f64) -> u32 {
    (ratio * 100.0).round().max(0.0) as u32
}

impl<C: Clock> Session<C> {
    /// Milliseconds from start to now, or to the end if the session ended.
    fn elapsed_ms(&self) -> i64 {
        match self.state.start_ms {
            Some(start) => {
                let until = self.state.end_ms.unwrap_or_else(|| self.clock.now_ms());
                (until - start).max(0)
            }
            None => 0,
        }
    }

    /// Session length in seconds; 0 before the first start.
    pub fn duration_secs(&self) -> f64 {
        self.elapsed_ms() as f64 / 1000.0
    }

    /// `None` until a face has been seen.
    pub fn time_to_first_detection_secs(&self) -> Option<f64> {
        let start = self.state.start_ms?;
        let first = self.state.first_detection_ms?;
        Some((first - start) as f64 / 1000.0)
    }

    pub fn most_frequent_emotion(&self) -> Option<Emotion> {
        self.frequency.most_frequent()
    }

    /// Mean dominant-channel confidence for one channel, or overall.
    pub fn average_confidence(&self, emotion: Option<Emotion>) -> f64 {
        self.frequency.average_confidence(emotion)
    }

    /// History entries from the last `window_secs`, timed relative to the
    /// session start.
    pub fn timeline(&self, window_secs: u64) -> Vec<TimelinePoint> {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(span_ms(window_secs.saturating_mul(1000)));
        let start = self.state.start_ms.unwrap_or(0);
        self.history
            .since(cutoff)
            .map(|e| TimelinePoint {
                time_secs: (e.timestamp_ms - start) as f64 / 1000.0,
                emotion: e.emotion,
                confidence: e.confidence,
                face_count: e.face_count,
            })
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        let elapsed_ms = self.elapsed_ms();
        let frames = self.state.total_frames;

        let attention_percent = if elapsed_ms > 0 {
            percent(self.gaze.attention_ms() as f64 / elapsed_ms as f64)
        } else {
            0
        };
        let face_detection_rate = if frames > 0 {
            percent(self.state.frames_with_face as f64 / frames as f64)
        } else {
            0
        };

        SessionSummary {
            session_id: self.state.id,
            duration_secs: (elapsed_ms as f64 / 1000.0).round() as u64,
            time_to_first_detection_secs: self
                .time_to_first_detection_secs()
                .map(|s| (s * 10.0).round() / 10.0),
            most_frequent_emotion: self.most_frequent_emotion(),
            average_confidence: percent(self.average_confidence(None)),
            frames_analyzed: frames,
            frames_with_face: self.state.frames_with_face,
            face_detection_rate,
            blink_count: self.blink.blink_count(),
            yawn_count: self.yawn.yawn_count(),
            look_away_count: self.gaze.look_away_count(),
            attention_percent,
            emotion_breakdown: self.frequency.breakdown(),
            is_calibrated: self.calibration.is_calibrated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::AnalyticsConfig;
    use crate::geometry::fixtures;
    use crate::types::{BoundingBox, DetectedFace, ExpressionVector};

    fn started() -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::new(100_000);
        let config = AnalyticsConfig {
            smoothing_factor: 1.0,
            ..Default::default()
        };
        let mut s = Session::with_clock(config, clock.clone()).unwrap();
        s.start();
        (s, clock)
    }

    fn face(emotion: Emotion, value: f32) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::default(),
            expressions: ExpressionVector::from_pairs([(emotion, value)]),
            landmarks: Some(fixtures::landmarks(6.0, 0.0, 100.0)),
        }
    }

    #[test]
    fn test_idle_queries() {
        let s = Session::with_clock(AnalyticsConfig::default(), ManualClock::new(5)).unwrap();
        assert_eq!(s.duration_secs(), 0.0);
        assert_eq!(s.time_to_first_detection_secs(), None);
        assert_eq!(s.most_frequent_emotion(), None);
        assert_eq!(s.average_confidence(None), 0.0);
        let summary = s.summary();
        assert_eq!(summary.frames_analyzed, 0);
        assert_eq!(summary.face_detection_rate, 0);
        assert_eq!(summary.attention_percent, 0);
        assert!(summary.session_id.is_none());
    }

    #[test]
    fn test_duration_runs_then_freezes() {
        let (mut s, clock) = started();
        clock.advance(2_500);
        assert!((s.duration_secs() - 2.5).abs() < 1e-9);
        s.end();
        clock.advance(10_000);
        assert!((s.duration_secs() - 2.5).abs() < 1e-9);
        assert_eq!(s.summary().duration_secs, 3);
    }

    #[test]
    fn test_time_to_first_detection() {
        let (mut s, clock) = started();
        s.process_frame(&[]);
        clock.advance(1_234);
        s.process_frame(&[face(Emotion::Happy, 0.9)]);
        assert!((s.time_to_first_detection_secs().unwrap() - 1.234).abs() < 1e-9);
        assert_eq!(s.summary().time_to_first_detection_secs, Some(1.2));
    }

    #[test]
    fn test_timeline_window_and_rebase() {
        let (mut s, clock) = started();
        for _ in 0..5 {
            s.process_frame(&[face(Emotion::Sad, 0.7)]);
            clock.advance(1_000);
        }
        // entries at +0..+4s, now at +5s
        let all = s.timeline(60);
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].time_secs, 0.0);
        assert_eq!(all[4].time_secs, 4.0);
        assert_eq!(all[4].emotion, Some(Emotion::Sad));

        let recent = s.timeline(2);
        let times: Vec<f64> = recent.iter().map(|p| p.time_secs).collect();
        assert_eq!(times, vec![3.0, 4.0]);
    }

    #[test]
    fn test_timeline_huge_window_returns_everything() {
        let (mut s, clock) = started();
        for _ in 0..3 {
            s.process_frame(&[face(Emotion::Happy, 0.7)]);
            clock.advance(1_000);
        }
        assert_eq!(s.timeline(10_000_000_000_000_000).len(), 3);
        assert_eq!(s.timeline(u64::MAX).len(), 3);
    }

    #[test]
    fn test_summary_counts() {
        let (mut s, clock) = started();
        s.process_frame(&[face(Emotion::Happy, 0.8)]);
        clock.advance(500);
        s.process_frame(&[face(Emotion::Happy, 0.6)]);
        clock.advance(500);
        s.process_frame(&[]);
        clock.advance(500);
        s.process_frame(&[face(Emotion::Sad, 0.4)]);
        clock.advance(500);

        let summary = s.summary();
        assert_eq!(summary.frames_analyzed, 4);
        assert_eq!(summary.frames_with_face, 3);
        assert_eq!(summary.face_detection_rate, 75);
        assert_eq!(summary.most_frequent_emotion, Some(Emotion::Happy));
        assert_eq!(summary.average_confidence, 60);
        assert_eq!(summary.emotion_breakdown[&Emotion::Happy], 2);
        assert_eq!(summary.emotion_breakdown[&Emotion::Sad], 1);
        // looking from t=0 through the last sample at t=1500, of 2000 total
        assert_eq!(summary.attention_percent, 75);
        assert_eq!(summary.duration_secs, 2);
        assert!(!summary.is_calibrated);
    }

    #[test]
    fn test_summary_survives_end_until_restart() {
        let (mut s, _) = started();
        s.process_frame(&[face(Emotion::Happy, 0.8)]);
        s.end();
        assert_eq!(s.summary().frames_analyzed, 1);
        s.start();
        assert_eq!(s.summary().frames_analyzed, 0);
        assert_eq!(s.summary().most_frequent_emotion, None);
    }

    #[test]
    fn test_summary_serializes_lowercase_channels() {
        let (mut s, _) = started();
        s.process_frame(&[face(Emotion::Surprised, 0.8)]);
        let json = serde_json::to_value(s.summary()).unwrap();
        assert_eq!(json["most_frequent_emotion"], "surprised");
        assert_eq!(json["emotion_breakdown"]["surprised"], 1);
    }
}
