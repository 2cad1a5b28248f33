//! Mouth-aspect ratio from four facial landmarks.

use crate::domain::Landmarks;

use super::distance;

/// Computes the mouth-aspect ratio of a face.
///
/// There is no upper-lip landmark, so the top of the mouth is approximated as
/// the midpoint of the nose base and the bottom of the lower lip. The ratio is
/// the distance from that point to the lip bottom over the mouth width.
///
/// Returns 0.0 ("mouth closed") when any landmark is missing or the mouth
/// corners coincide.
#[must_use]
pub fn mouth_ratio(landmarks: &Landmarks) -> f64 {
    let (Some(left), Some(right), Some(bottom), Some(nose)) = (
        landmarks.mouth_left,
        landmarks.mouth_right,
        landmarks.mouth_bottom,
        landmarks.nose_base,
    ) else {
        return 0.0;
    };

    let top = nose.midpoint(bottom);
    let vertical = distance(top, bottom);
    let horizontal = distance(left, right);

    if horizontal > 0.0 {
        vertical / horizontal
    } else {
        0.0
    }
}
