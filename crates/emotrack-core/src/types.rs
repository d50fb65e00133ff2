use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of channels in the expression classifier output.
pub const CHANNEL_COUNT: usize = 7;

/// Point count of the 68-point iBUG landmark layout.
pub const LANDMARK_68_COUNT: usize = 68;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown expression channel: {0}")]
    UnknownChannel(String),
    #[error("expression channel {channel} is not finite: {value}")]
    NonFinite { channel: Emotion, value: f32 },
    #[error("expected {expected} landmark points, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },
}

/// One channel of the expression classifier.
///
/// Declaration order is the fixed channel order used for every tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    pub const ALL: [Emotion; CHANNEL_COUNT] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownChannel(s.to_string()))
    }
}

/// Per-channel probabilities for one face, as produced by the classifier.
///
/// Values are used as-is; they are not required to sum to 1. On the wire this
/// is a `{ "happy": 0.9, ... }` map. The vector remembers which channels the
/// map carried: absent channels read as 0 but are skipped by [`iter`](Self::iter),
/// so smoothing and calibration leave them untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, f32>",
    into = "BTreeMap<Emotion, f32>"
)]
pub struct ExpressionVector {
    values: [f32; CHANNEL_COUNT],
    /// Bit `i` set when channel `i` carries a value.
    present: u8,
}

const ALL_PRESENT: u8 = (1 << CHANNEL_COUNT) - 1;

impl ExpressionVector {
    /// A vector with every channel present.
    pub fn new(values: [f32; CHANNEL_COUNT]) -> Self {
        Self {
            values,
            present: ALL_PRESENT,
        }
    }

    /// Build a vector from `(channel, value)` pairs; other channels are absent.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f32)>,
    {
        let mut v = Self::default();
        for (emotion, value) in pairs {
            v.set(emotion, value);
        }
        v
    }

    /// Value of `emotion`, 0 when absent.
    pub fn get(&self, emotion: Emotion) -> f32 {
        self.values[emotion.index()]
    }

    /// Store a value and mark the channel present.
    pub fn set(&mut self, emotion: Emotion, value: f32) {
        self.values[emotion.index()] = value;
        self.present |= 1 << emotion.index();
    }

    pub fn contains(&self, emotion: Emotion) -> bool {
        self.present & (1 << emotion.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.present == 0
    }

    /// Iterate present `(channel, value)` pairs in fixed channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL
            .iter()
            .filter(move |&&e| self.contains(e))
            .map(move |&e| (e, self.get(e)))
    }

    /// Apply `f(self, other)` over the channels present in `self`; `other`
    /// reads 0 where absent. The result has the same channels as `self`.
    pub fn zip_with(&self, other: &ExpressionVector, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut out = Self::default();
        for (emotion, value) in self.iter() {
            out.set(emotion, f(value, other.get(emotion)));
        }
        out
    }

    /// The max-probability channel and its value.
    ///
    /// A channel must be strictly greater than the running max (starting at
    /// 0) to win, so ties go to the earlier channel and a vector with no
    /// positive value has no dominant channel.
    pub fn dominant(&self) -> (Option<Emotion>, f32) {
        let mut best: Option<Emotion> = None;
        let mut best_value = 0.0f32;
        for (emotion, value) in self.iter() {
            if value > best_value {
                best_value = value;
                best = Some(emotion);
            }
        }
        (best, best_value)
    }
}

impl TryFrom<BTreeMap<String, f32>> for ExpressionVector {
    type Error = ValidationError;

    fn try_from(map: BTreeMap<String, f32>) -> Result<Self, Self::Error> {
        let mut v = Self::default();
        for (name, value) in map {
            let channel: Emotion = name.parse()?;
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { channel, value });
            }
            v.set(channel, value);
        }
        Ok(v)
    }
}

impl From<ExpressionVector> for BTreeMap<Emotion, f32> {
    fn from(v: ExpressionVector) -> Self {
        v.iter().collect()
    }
}

/// A 2-D landmark coordinate in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(alias = "_x")]
    pub x: f32,
    #[serde(alias = "_y")]
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Mean position of a point group. `None` for an empty group.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Named facial landmark groups for one face.
///
/// Accepted on the wire either as named groups or as the flat 68-point
/// `positions` list emitted by 68-point landmark models.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawLandmarks")]
pub struct Landmarks {
    pub jaw_outline: Vec<Point>,
    pub left_eyebrow: Vec<Point>,
    pub right_eyebrow: Vec<Point>,
    pub nose: Vec<Point>,
    pub left_eye: Vec<Point>,
    pub right_eye: Vec<Point>,
    pub mouth: Vec<Point>,
}

impl Landmarks {
    /// Split a 68-point iBUG layout into named groups.
    ///
    /// Eye groups follow the detector's own slicing: points 36–41 are the
    /// left eye and 42–47 the right eye.
    pub fn from_68_points(points: &[Point]) -> Result<Self, ValidationError> {
        if points.len() != LANDMARK_68_COUNT {
            return Err(ValidationError::LandmarkCount {
                expected: LANDMARK_68_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self {
            jaw_outline: points[0..17].to_vec(),
            left_eyebrow: points[17..22].to_vec(),
            right_eyebrow: points[22..27].to_vec(),
            nose: points[27..36].to_vec(),
            left_eye: points[36..42].to_vec(),
            right_eye: points[42..48].to_vec(),
            mouth: points[48..68].to_vec(),
        })
    }

    pub fn left_eye(&self) -> Option<&[Point]> {
        non_empty(&self.left_eye)
    }

    pub fn right_eye(&self) -> Option<&[Point]> {
        non_empty(&self.right_eye)
    }

    pub fn nose(&self) -> Option<&[Point]> {
        non_empty(&self.nose)
    }

    pub fn mouth(&self) -> Option<&[Point]> {
        non_empty(&self.mouth)
    }
}

fn non_empty(points: &[Point]) -> Option<&[Point]> {
    if points.is_empty() {
        None
    } else {
        Some(points)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLandmarks {
    Positions { positions: Vec<Point> },
    Groups(LandmarkGroups),
}

#[derive(Deserialize)]
struct LandmarkGroups {
    #[serde(default)]
    jaw_outline: Vec<Point>,
    #[serde(default)]
    left_eyebrow: Vec<Point>,
    #[serde(default)]
    right_eyebrow: Vec<Point>,
    #[serde(default)]
    nose: Vec<Point>,
    #[serde(default)]
    left_eye: Vec<Point>,
    #[serde(default)]
    right_eye: Vec<Point>,
    #[serde(default)]
    mouth: Vec<Point>,
}

impl TryFrom<RawLandmarks> for Landmarks {
    type Error = ValidationError;

    fn try_from(raw: RawLandmarks) -> Result<Self, Self::Error> {
        match raw {
            RawLandmarks::Positions { positions } => Landmarks::from_68_points(&positions),
            RawLandmarks::Groups(g) => Ok(Landmarks {
                jaw_outline: g.jaw_outline,
                left_eyebrow: g.left_eyebrow,
                right_eyebrow: g.right_eyebrow,
                nose: g.nose,
                left_eye: g.left_eye,
                right_eye: g.right_eye,
                mouth: g.mouth,
            }),
        }
    }
}

/// Bounding box for a detected face, in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One face as reported by the external detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub expressions: ExpressionVector,
    #[serde(default)]
    pub landmarks: Option<Landmarks>,
}

/// One detector result: zero or more faces observed in a single frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectorFrame {
    /// Capture time in wall-clock milliseconds, when the producer knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<i64>,
    #[serde(default)]
    pub faces: Vec<DetectedFace>,
}
