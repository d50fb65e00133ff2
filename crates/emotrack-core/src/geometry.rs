//! Scalar ratios over landmark groups: eye/mouth aspect ratios and gaze deviation.
//!
//! Every function has a defined fallback for missing or degenerate geometry,
//! so a frame with incomplete landmarks never aborts processing.

use crate::types::{centroid, Landmarks, Point};

/// Minimum eye group size: p1..p6 around the eye contour.
const EYE_POINTS: usize = 6;
/// Minimum mouth outline size for the MAR sample points below.
const MOUTH_POINTS: usize = 12;
const MOUTH_LEFT: usize = 0;
const MOUTH_TOP: usize = 3;
const MOUTH_RIGHT: usize = 6;
const MOUTH_BOTTOM: usize = 9;
/// Nose tip within the nose group (the bottom of the bridge).
const NOSE_TIP: usize = 3;

/// Eye aspect ratio: `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.
///
/// Returns 1.0 ("fully open") for fewer than six points or a zero-width eye.
pub fn eye_aspect_ratio(eye: &[Point]) -> f32 {
    if eye.len() < EYE_POINTS {
        return 1.0;
    }
    let horizontal = eye[0].distance(&eye[3]);
    if horizontal == 0.0 {
        return 1.0;
    }
    let vertical1 = eye[1].distance(&eye[5]);
    let vertical2 = eye[2].distance(&eye[4]);
    (vertical1 + vertical2) / (2.0 * horizontal)
}

/// Mean EAR of both eyes. A missing eye group counts as open.
pub fn binocular_eye_aspect_ratio(landmarks: &Landmarks) -> f32 {
    let left = eye_aspect_ratio(landmarks.left_eye().unwrap_or_default());
    let right = eye_aspect_ratio(landmarks.right_eye().unwrap_or_default());
    (left + right) / 2.0
}

/// Mouth aspect ratio over an ordered outer-lip outline: top-to-bottom
/// distance over corner-to-corner distance.
///
/// Returns 0.0 for fewer than twelve points or a zero-width mouth.
pub fn mouth_aspect_ratio(mouth: &[Point]) -> f32 {
    if mouth.len() < MOUTH_POINTS {
        return 0.0;
    }
    let horizontal = mouth[MOUTH_LEFT].distance(&mouth[MOUTH_RIGHT]);
    if horizontal == 0.0 {
        return 0.0;
    }
    mouth[MOUTH_TOP].distance(&mouth[MOUTH_BOTTOM]) / horizontal
}

/// Horizontal offset of the nose tip from the midpoint between the eye
/// centroids, normalized by the horizontal inter-eye distance.
///
/// `None` when a group is missing, the nose group has no tip point, or the
/// eye centroids share an x coordinate. Callers treat `None` as "not looking".
pub fn gaze_deviation(
    left_eye: Option<&[Point]>,
    right_eye: Option<&[Point]>,
    nose: Option<&[Point]>,
) -> Option<f32> {
    let nose = nose?;
    if nose.len() <= NOSE_TIP {
        return None;
    }
    let left = centroid(left_eye?)?;
    let right = centroid(right_eye?)?;

    let eye_distance = (right.x - left.x).abs();
    if eye_distance == 0.0 {
        return None;
    }
    let center_x = (left.x + right.x) / 2.0;
    Some((nose[NOSE_TIP].x - center_x).abs() / eye_distance)
}

/// [`gaze_deviation`] over a face's named groups.
pub fn face_gaze_deviation(landmarks: &Landmarks) -> Option<f32> {
    gaze_deviation(landmarks.left_eye(), landmarks.right_eye(), landmarks.nose())
}
