//! Alert levels, per-frame signals and the thresholds that relate them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ThresholdError;

/// Published alert level.
///
/// Ordered by severity (`None < Low < Critical`). Transitions between levels
/// are not required to be monotonic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Driver appears awake.
    #[default]
    None,
    /// Early warning: partially closed eyes or yawning.
    Low,
    /// Deeply closed eyes held long enough to count as falling asleep.
    Critical,
}

impl AlertLevel {
    /// Returns true for `Low` and `Critical`.
    #[must_use]
    pub const fn is_raised(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Critical => "CRITICAL",
        })
    }
}

/// Measurement derived from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSignal {
    /// Probability that the eyes are open, in `[0, 1]`.
    pub openness: f64,
    /// Mouth-aspect ratio (vertical opening over mouth width), `>= 0`.
    pub mouth_ratio: f64,
}

impl FrameSignal {
    /// Signal used when no face is found: eyes open, mouth closed.
    pub const NO_FACE: Self = Self {
        openness: 1.0,
        mouth_ratio: 0.0,
    };

    /// Creates a new frame signal.
    #[must_use]
    pub const fn new(openness: f64, mouth_ratio: f64) -> Self {
        Self {
            openness,
            mouth_ratio,
        }
    }
}

/// Mutable detection state owned by the alert state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionState {
    /// Consecutive drowsy-or-yawning frames.
    pub frame_counter: u32,
    /// Current alert level.
    pub alert_level: AlertLevel,
}

/// Thresholds driving the alert state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Openness below this means the eyes are deeply closed.
    pub critical_openness: f64,
    /// Openness below this means the eyes are partially closed.
    pub low_openness: f64,
    /// Mouth ratio above this counts as a yawn.
    pub yawn_ratio: f64,
    /// Consecutive frames required to confirm `Low`.
    pub low_frames: u32,
    /// Consecutive frames required to confirm `Critical`.
    pub critical_frames: u32,
    /// Margin over `low_openness` above which the eyes are clearly open.
    pub awake_margin: f64,
    /// Mouth ratio must stay below this to count as awake.
    pub awake_mouth_ceiling: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            critical_openness: 0.30,
            low_openness: 0.50,
            yawn_ratio: 0.60,
            low_frames: 10,
            critical_frames: 30,
            awake_margin: 0.10,
            awake_mouth_ceiling: 0.50,
        }
    }
}

impl Thresholds {
    /// Openness above which the awake branch applies.
    #[must_use]
    pub fn awake_openness(&self) -> f64 {
        self.low_openness + self.awake_margin
    }

    /// Checks that every threshold is in range and that they are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns the first offending threshold.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.critical_openness) {
            return Err(ThresholdError::new(
                "critical_openness",
                "in 0.0..=1.0",
                self.critical_openness,
            ));
        }
        if !unit.contains(&self.low_openness) {
            return Err(ThresholdError::new(
                "low_openness",
                "in 0.0..=1.0",
                self.low_openness,
            ));
        }
        if self.critical_openness > self.low_openness {
            return Err(ThresholdError::new(
                "critical_openness",
                "<= low_openness",
                self.critical_openness,
            ));
        }
        if !(self.yawn_ratio >= 0.0 && self.yawn_ratio.is_finite()) {
            return Err(ThresholdError::new("yawn_ratio", ">= 0.0", self.yawn_ratio));
        }
        if !(self.awake_margin >= 0.0 && self.awake_margin.is_finite()) {
            return Err(ThresholdError::new(
                "awake_margin",
                ">= 0.0",
                self.awake_margin,
            ));
        }
        if !(self.awake_mouth_ceiling >= 0.0 && self.awake_mouth_ceiling.is_finite()) {
            return Err(ThresholdError::new(
                "awake_mouth_ceiling",
                ">= 0.0",
                self.awake_mouth_ceiling,
            ));
        }
        if self.low_frames == 0 {
            return Err(ThresholdError::new("low_frames", ">= 1", self.low_frames));
        }
        if self.critical_frames < self.low_frames {
            return Err(ThresholdError::new(
                "critical_frames",
                ">= low_frames",
                self.critical_frames,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(AlertLevel::None < AlertLevel::Low);
        assert!(AlertLevel::Low < AlertLevel::Critical);
        assert_eq!(AlertLevel::Low.max(AlertLevel::Critical), AlertLevel::Critical);
    }

    #[test]
    fn test_level_display_and_serde() {
        assert_eq!(AlertLevel::Critical.to_string(), "CRITICAL");
        let json = serde_json::to_string(&AlertLevel::Low).unwrap_or_default();
        assert_eq!(json, "\"low\"");
    }

    #[test]
    fn test_default_thresholds() {
        let t = Thresholds::default();
        assert!((t.critical_openness - 0.30).abs() < f64::EPSILON);
        assert!((t.low_openness - 0.50).abs() < f64::EPSILON);
        assert!((t.yawn_ratio - 0.60).abs() < f64::EPSILON);
        assert_eq!(t.low_frames, 10);
        assert_eq!(t.critical_frames, 30);
        assert!((t.awake_openness() - 0.60).abs() < 1e-9);
        assert!((t.awake_mouth_ceiling - 0.50).abs() < f64::EPSILON);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_openness() {
        let t = Thresholds {
            critical_openness: 0.6,
            low_openness: 0.4,
            ..Thresholds::default()
        };
        let err = t.validate().err();
        assert_eq!(err.map(|e| e.name), Some("critical_openness"));
    }

    #[test]
    fn test_validate_rejects_frame_counts() {
        let t = Thresholds {
            low_frames: 0,
            ..Thresholds::default()
        };
        assert!(t.validate().is_err());

        let t = Thresholds {
            low_frames: 20,
            critical_frames: 10,
            ..Thresholds::default()
        };
        assert_eq!(t.validate().err().map(|e| e.name), Some("critical_frames"));
    }

    #[test]
    fn test_no_face_signal() {
        assert_eq!(FrameSignal::NO_FACE, FrameSignal::new(1.0, 0.0));
    }
}
