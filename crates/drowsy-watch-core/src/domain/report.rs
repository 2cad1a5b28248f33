//! Serializable records of what the pipeline did.

use serde::{Deserialize, Serialize};

use super::{AlertLevel, DetectionState, FrameSignal};

/// What happened to a submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Dropped by the rate limiter (or the worker backlog).
    Throttled,
    /// No face found; the awake signal was applied.
    NoFace,
    /// A face was analyzed and the state machine advanced.
    Analyzed,
    /// The face detector failed; the frame was skipped.
    DetectorFailed,
    /// The classifier failed; the frame was skipped.
    ClassifierFailed,
}

/// Per-frame record written by report outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Position of the frame in the session (0-based).
    pub index: usize,
    /// Path or URI of the frame.
    pub path: String,
    /// What happened to the frame.
    pub outcome: OutcomeKind,
    /// Eye openness, when the frame produced a signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openness: Option<f64>,
    /// Mouth ratio, when the frame produced a signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_ratio: Option<f64>,
    /// Alert level after the frame.
    pub alert_level: AlertLevel,
    /// Consecutive drowsy-or-yawning frame count after the frame.
    pub frame_counter: u32,
    /// Failure description for skipped frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time the report was produced (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl FrameReport {
    /// Builds a report from a frame's outcome and the detection state after it.
    #[must_use]
    pub fn new(
        index: usize,
        path: impl Into<String>,
        outcome: OutcomeKind,
        signal: Option<FrameSignal>,
        state: DetectionState,
    ) -> Self {
        Self {
            index,
            path: path.into(),
            outcome,
            openness: signal.map(|s| s.openness),
            mouth_ratio: signal.map(|s| s.mouth_ratio),
            alert_level: state.alert_level,
            frame_counter: state.frame_counter,
            error: None,
            timestamp: None,
        }
    }

    /// Stamps the report with a wall-clock time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Attaches a failure description.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Totals for a finished monitoring session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Frames submitted.
    pub submitted: usize,
    /// Frames that passed the rate limiter and were analyzed (including no-face frames).
    pub analyzed: usize,
    /// Frames dropped by the rate limiter.
    pub throttled: usize,
    /// Frames skipped because the detector or classifier failed.
    pub failed: usize,
    /// Highest alert level reached during the session.
    pub peak_level: AlertLevel,
    /// Alert level when the session ended.
    pub final_level: AlertLevel,
}

impl SessionSummary {
    /// Accounts for one frame report.
    pub fn record(&mut self, report: &FrameReport) {
        self.submitted += 1;
        match report.outcome {
            OutcomeKind::Throttled => self.throttled += 1,
            OutcomeKind::NoFace | OutcomeKind::Analyzed => self.analyzed += 1,
            OutcomeKind::DetectorFailed | OutcomeKind::ClassifierFailed => self.failed += 1,
        }
        self.peak_level = self.peak_level.max(report.alert_level);
        self.final_level = report.alert_level;
    }
}

/// One-shot result of analyzing a still image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StillVerdict {
    /// Path or URI of the image.
    pub path: String,
    /// Eye openness probability (1.0 when no face was found or analysis failed).
    pub openness: f64,
    /// `Open_Eyes` or `Closed_Eyes`.
    pub label: String,
    /// Human-readable result line.
    pub result: String,
}

impl StillVerdict {
    /// Label for images whose eyes are judged open.
    pub const OPEN: &'static str = "Open_Eyes";
    /// Label for images whose eyes are judged closed.
    pub const CLOSED: &'static str = "Closed_Eyes";

    /// Classifies an openness score: strictly above 0.5 is open.
    #[must_use]
    pub fn from_openness(path: impl Into<String>, openness: f64) -> Self {
        let label = if openness > 0.5 {
            Self::OPEN
        } else {
            Self::CLOSED
        };
        Self {
            path: path.into(),
            openness,
            label: label.to_string(),
            result: format!("{label} - Score: {openness:.2}"),
        }
    }
}
