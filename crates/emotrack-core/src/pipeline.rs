//! Per-frame orchestration: one detector result in, one [`FrameResult`] out.

use crate::clock::Clock;
use crate::geometry;
use crate::history::HistoryEntry;
use crate::session::Session;
use crate::types::{BoundingBox, DetectedFace, Emotion, ExpressionVector};
use serde::Serialize;

/// Analysis of one face within a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceResult {
    /// Index in the detector's output order; 0 is the primary face.
    pub id: usize,
    pub emotion: Option<Emotion>,
    pub confidence: f32,
    /// Smoothed (primary only) and calibration-adjusted expressions.
    pub expressions: ExpressionVector,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Analysis of one frame. Primary-face fields are defaults when no face was
/// detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub timestamp_ms: i64,
    pub face_count: usize,
    pub faces: Vec<FaceResult>,
    pub is_stable: bool,
    pub dominant_emotion: Option<Emotion>,
    pub confidence: f32,
    pub attention: bool,
    pub is_blinking: bool,
    pub is_yawning: bool,
}

impl FrameResult {
    fn empty(timestamp_ms: i64, face_count: usize) -> Self {
        Self {
            timestamp_ms,
            face_count,
            faces: Vec::with_capacity(face_count),
            is_stable: false,
            dominant_emotion: None,
            confidence: 0.0,
            attention: false,
            is_blinking: false,
            is_yawning: false,
        }
    }
}

impl<C: Clock> Session<C> {
    /// Process one detector result.
    ///
    /// Returns `None` when no session is active. A frame without faces only
    /// advances the frame counter. Otherwise every face is scored, the
    /// primary face alone drives smoothing, stability, frequency, gaze,
    /// blink and yawn tracking, and a history entry is appended if the
    /// throttle interval has passed.
    pub fn process_frame(&mut self, faces: &[DetectedFace]) -> Option<FrameResult> {
        if !self.state.active {
            return None;
        }

        self.state.total_frames += 1;
        let timestamp_ms = self.clock.now_ms();
        let mut result = FrameResult::empty(timestamp_ms, faces.len());

        if faces.is_empty() {
            self.last_primary = None;
            return Some(result);
        }

        if self.state.first_detection_ms.is_none() {
            self.state.first_detection_ms = Some(timestamp_ms);
            tracing::debug!(
                after_ms = timestamp_ms - self.state.start_ms.unwrap_or(timestamp_ms),
                "first face detected"
            );
        }
        self.state.frames_with_face += 1;

        for (index, face) in faces.iter().enumerate() {
            let primary = index == 0;
            let expressions = if primary {
                let smoothed = self.smoother.smooth(&face.expressions);
                self.last_primary = Some(smoothed);
                smoothed
            } else {
                face.expressions
            };
            let adjusted = self.calibration.deviation(&expressions);
            let (emotion, confidence) = adjusted.dominant();

            if primary {
                self.track_primary(face, emotion, confidence, timestamp_ms, &mut result);
            }

            result.faces.push(FaceResult {
                id: index,
                emotion,
                confidence,
                expressions: adjusted,
                bbox: face.bbox,
            });
        }

        self.history.record(
            HistoryEntry {
                timestamp_ms,
                emotion: result.dominant_emotion,
                confidence: result.confidence,
                face_count: result.face_count,
            },
            self.config.timeline_resolution_ms,
            self.config.retention_ms(),
        );

        Some(result)
    }

    fn track_primary(
        &mut self,
        face: &DetectedFace,
        emotion: Option<Emotion>,
        confidence: f32,
        timestamp_ms: i64,
        result: &mut FrameResult,
    ) {
        result.is_stable = self.stability.update(emotion);
        result.dominant_emotion = emotion;
        result.confidence = confidence;

        if let Some(emotion) = emotion {
            self.frequency.record(emotion, confidence);
        }

        let Some(landmarks) = &face.landmarks else {
            return;
        };

        result.attention = match geometry::face_gaze_deviation(landmarks) {
            Some(deviation) => self.gaze.update(deviation, timestamp_ms),
            None => false,
        };
        result.is_blinking = self
            .blink
            .update(geometry::binocular_eye_aspect_ratio(landmarks));
        result.is_yawning = self
            .yawn
            .update(geometry::mouth_aspect_ratio(landmarks.mouth().unwrap_or_default()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::AnalyticsConfig;
    use crate::geometry::fixtures;
    use crate::types::Landmarks;

    fn session(config: AnalyticsConfig) -> (Session<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let mut s = Session::with_clock(config, clock.clone()).unwrap();
        s.start();
        (s, clock)
    }

    fn face(pairs: &[(Emotion, f32)], landmarks: Option<Landmarks>) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox {
                x: 10.0,
                y: 20.0,
                width: 100.0,
                height: 120.0,
            },
            expressions: ExpressionVector::from_pairs(pairs.iter().copied()),
            landmarks,
        }
    }

    fn passthrough() -> AnalyticsConfig {
        AnalyticsConfig {
            smoothing_factor: 1.0,
            stability_frames: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_idle_session_is_noop() {
        let clock = ManualClock::new(0);
        let mut s = Session::with_clock(AnalyticsConfig::default(), clock).unwrap();
        assert!(s.process_frame(&[face(&[(Emotion::Happy, 1.0)], None)]).is_none());
        assert_eq!(s.state().total_frames, 0);
    }

    #[test]
    fn test_ended_session_is_noop() {
        let (mut s, _) = session(passthrough());
        s.end();
        assert!(s.process_frame(&[]).is_none());
        assert_eq!(s.state().total_frames, 0);
    }

    #[test]
    fn test_faceless_frame_touches_only_counter() {
        let (mut s, clock) = session(passthrough());
        clock.set(40);
        let r = s.process_frame(&[]).unwrap();
        assert_eq!(r.face_count, 0);
        assert_eq!(r.timestamp_ms, 40);
        assert!(r.faces.is_empty());
        assert!(r.dominant_emotion.is_none());
        assert!(!r.is_stable);
        assert_eq!(s.state().total_frames, 1);
        assert_eq!(s.state().frames_with_face, 0);
        assert!(s.state().first_detection_ms.is_none());
        assert!(s.history().is_empty());
        assert_eq!(s.stability.run_length(), 0);
    }

    #[test]
    fn test_first_detection_latched_once() {
        let (mut s, clock) = session(passthrough());
        s.process_frame(&[]);
        clock.set(1_500);
        s.process_frame(&[face(&[(Emotion::Happy, 0.9)], None)]);
        clock.set(3_000);
        s.process_frame(&[face(&[(Emotion::Happy, 0.9)], None)]);
        assert_eq!(s.state().first_detection_ms, Some(1_500));
        assert_eq!(s.state().frames_with_face, 2);
        assert_eq!(s.state().total_frames, 3);
    }

    #[test]
    fn test_stability_sequence_through_pipeline() {
        let (mut s, _) = session(passthrough());
        let happy = [face(&[(Emotion::Happy, 0.9)], None)];
        let sad = [face(&[(Emotion::Sad, 0.9)], None)];
        assert!(!s.process_frame(&happy).unwrap().is_stable);
        assert!(!s.process_frame(&happy).unwrap().is_stable);
        assert!(s.process_frame(&happy).unwrap().is_stable);
        assert!(!s.process_frame(&sad).unwrap().is_stable);
    }

    #[test]
    fn test_smoothing_only_on_primary() {
        let config = AnalyticsConfig {
            smoothing_factor: 0.5,
            ..Default::default()
        };
        let (mut s, _) = session(config);
        let r = s
            .process_frame(&[
                face(&[(Emotion::Happy, 0.8)], None),
                face(&[(Emotion::Angry, 0.8)], None),
            ])
            .unwrap();
        assert!((r.faces[0].expressions.get(Emotion::Happy) - 0.4).abs() < 1e-6);
        assert!((r.faces[1].expressions.get(Emotion::Angry) - 0.8).abs() < 1e-6);
        assert_eq!(r.faces[1].emotion, Some(Emotion::Angry));
        assert_eq!(r.faces[1].id, 1);
        assert_eq!(r.dominant_emotion, Some(Emotion::Happy));
    }

    #[test]
    fn test_secondary_faces_do_not_touch_statistics() {
        let (mut s, _) = session(passthrough());
        s.process_frame(&[
            face(&[(Emotion::Happy, 0.9)], None),
            face(&[(Emotion::Sad, 0.9)], None),
            face(&[(Emotion::Sad, 0.9)], None),
        ]);
        assert_eq!(s.frequency.count(Emotion::Happy), 1);
        assert_eq!(s.frequency.count(Emotion::Sad), 0);
    }

    #[test]
    fn test_calibration_applies_to_every_face() {
        let (mut s, _) = session(passthrough());
        s.calibrate_with(&ExpressionVector::from_pairs([(Emotion::Neutral, 0.7)]));
        let r = s
            .process_frame(&[
                face(&[(Emotion::Neutral, 0.8), (Emotion::Happy, 0.2)], None),
                face(&[(Emotion::Neutral, 0.5), (Emotion::Sad, 0.1)], None),
            ])
            .unwrap();
        assert_eq!(r.faces[0].emotion, Some(Emotion::Happy));
        assert!((r.faces[0].confidence - 0.2).abs() < 1e-6);
        assert_eq!(r.faces[1].expressions.get(Emotion::Neutral), 0.0);
        assert_eq!(r.faces[1].emotion, Some(Emotion::Sad));
    }

    #[test]
    fn test_calibrate_uses_latest_primary() {
        let (mut s, _) = session(passthrough());
        s.process_frame(&[face(&[(Emotion::Neutral, 0.6), (Emotion::Happy, 0.1)], None)]);
        s.calibrate().unwrap();
        let r = s
            .process_frame(&[face(&[(Emotion::Neutral, 0.6), (Emotion::Happy, 0.1)], None)])
            .unwrap();
        assert_eq!(r.dominant_emotion, None, "baseline cancels itself out");
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn test_calibrate_refused_after_faceless_frame() {
        let (mut s, _) = session(passthrough());
        s.process_frame(&[face(&[(Emotion::Happy, 0.6)], None)]);
        s.process_frame(&[]);
        assert!(s.calibrate().is_err());
    }

    #[test]
    fn test_null_dominant_still_drives_stability() {
        let config = AnalyticsConfig {
            smoothing_factor: 1.0,
            stability_frames: 2,
            ..Default::default()
        };
        let (mut s, _) = session(config);
        let blank = [face(&[], None)];
        assert!(!s.process_frame(&blank).unwrap().is_stable);
        let r = s.process_frame(&blank).unwrap();
        assert!(r.is_stable);
        assert_eq!(r.dominant_emotion, None);
        assert_eq!(s.frequency.total(), 0);
    }

    #[test]
    fn test_without_landmarks_no_events() {
        let (mut s, _) = session(passthrough());
        let r = s.process_frame(&[face(&[(Emotion::Happy, 0.9)], None)]).unwrap();
        assert!(!r.attention);
        assert!(!r.is_blinking);
        assert!(!r.is_yawning);
    }

    #[test]
    fn test_blink_and_attention_events() {
        let (mut s, clock) = session(passthrough());
        let open = Some(fixtures::landmarks(6.0, 0.0, 100.0));
        let closed = Some(fixtures::landmarks(1.0, 0.0, 100.0));

        let r = s.process_frame(&[face(&[(Emotion::Neutral, 0.9)], open.clone())]).unwrap();
        assert!(r.attention);
        assert!(!r.is_blinking);

        clock.advance(100);
        let r = s.process_frame(&[face(&[(Emotion::Neutral, 0.9)], closed)]).unwrap();
        assert!(r.is_blinking);

        clock.advance(100);
        s.process_frame(&[face(&[(Emotion::Neutral, 0.9)], open)]);
        assert_eq!(s.blink_count(), 1);
        assert_eq!(s.attention_ms(), 200);
    }

    #[test]
    fn test_yawn_and_look_away_events() {
        let (mut s, clock) = session(passthrough());
        let yawning = Some(fixtures::landmarks(6.0, 30.0, 100.0));
        let turned = Some(fixtures::landmarks(6.0, 0.0, 130.0));
        let neutral = Some(fixtures::landmarks(6.0, 0.0, 100.0));

        let r = s.process_frame(&[face(&[(Emotion::Happy, 0.9)], yawning)]).unwrap();
        assert!(r.is_yawning);
        clock.advance(50);
        let r = s.process_frame(&[face(&[(Emotion::Happy, 0.9)], turned)]).unwrap();
        assert!(!r.attention);
        assert!(!r.is_yawning);
        clock.advance(50);
        s.process_frame(&[face(&[(Emotion::Happy, 0.9)], neutral)]);

        assert_eq!(s.yawn_count(), 1);
        assert_eq!(s.look_away_count(), 1);
    }

    #[test]
    fn test_history_throttled() {
        let (mut s, clock) = session(AnalyticsConfig {
            timeline_resolution_ms: 100,
            ..passthrough()
        });
        for _ in 0..100 {
            s.process_frame(&[face(&[(Emotion::Happy, 0.9)], None)]);
            clock.advance(10);
        }
        assert_eq!(s.history().len(), 10);
        assert!(s.history().check_invariants(100, s.config().retention_ms()));
    }

    #[test]
    fn test_config_swap_applies_next_frame() {
        let (mut s, _) = session(AnalyticsConfig {
            smoothing_factor: 1.0,
            stability_frames: 10,
            ..Default::default()
        });
        let happy = [face(&[(Emotion::Happy, 0.9)], None)];
        s.process_frame(&happy);
        assert!(!s.process_frame(&happy).unwrap().is_stable);
        s.update_config(passthrough()).unwrap();
        assert!(s.process_frame(&happy).unwrap().is_stable);
    }

    #[test]
    fn test_history_config_swap_mid_session() {
        let (mut s, clock) = session(AnalyticsConfig {
            timeline_resolution_ms: 100,
            ..passthrough()
        });
        let happy = [face(&[(Emotion::Happy, 0.9)], None)];
        for _ in 0..4 {
            s.process_frame(&happy);
            clock.advance(100);
        }
        assert_eq!(s.history().len(), 4);

        s.update_config(AnalyticsConfig {
            timeline_resolution_ms: 1000,
            history_duration_secs: 1,
            ..passthrough()
        })
        .unwrap();

        // 100 ms after the newest entry: throttled by the new resolution
        s.process_frame(&happy).unwrap();
        assert_eq!(s.history().len(), 4);

        // 1000 ms after the newest entry: kept, and the 1 s retention evicts
        clock.set(1_300);
        s.process_frame(&happy).unwrap();
        let ts: Vec<i64> = s.history().iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(ts, vec![300, 1_300]);
    }

    #[test]
    fn test_channel_missing_from_frame_keeps_smoothed_value() {
        let (mut s, _) = session(AnalyticsConfig {
            smoothing_factor: 0.5,
            ..Default::default()
        });
        s.process_frame(&[face(&[(Emotion::Happy, 1.0)], None)]);
        let frame: crate::types::DetectorFrame = serde_json::from_str(
            r#"{"faces": [{"box": {"x":0,"y":0,"width":1,"height":1}, "expressions": {"sad": 0.4}}]}"#,
        )
        .unwrap();
        let r = s.process_frame(&frame.faces).unwrap();

        assert!((s.smoother.current().get(Emotion::Happy) - 0.5).abs() < 1e-6);
        assert!(!r.faces[0].expressions.contains(Emotion::Happy));
        assert_eq!(r.dominant_emotion, Some(Emotion::Sad));
        assert!((r.confidence - 0.2).abs() < 1e-6);
    }
}
