//! Hysteresis state machine turning noisy per-frame signals into an alert level.

use tracing::{debug, info, warn};

use crate::domain::{AlertLevel, DetectionState, FrameSignal, Thresholds};

/// Computes the next detection state from the previous one and a frame signal.
///
/// Branches are checked in priority order:
///
/// 1. Deep-closed (`openness < critical_openness`): count the frame; at
///    `critical_frames` go `Critical`, at `low_frames` go at least `Low`.
///    `Critical` is never lowered here.
/// 2. Partially closed or yawning: count the frame; at `low_frames` raise
///    `None` to `Low`. Existing `Low`/`Critical` levels are not escalated.
/// 3. Clearly awake (openness above the awake margin, mouth below the
///    ceiling): reset the counter and clear the alert.
/// 4. Ambiguous band: reset the counter only if no alert is raised, so a
///    brief dip does not lose an escalation in progress.
///
/// A `NaN` openness or mouth ratio fails every comparison and lands in branch 4.
#[must_use]
pub fn transition(
    prev: DetectionState,
    signal: FrameSignal,
    thresholds: &Thresholds,
) -> DetectionState {
    let DetectionState {
        mut frame_counter,
        mut alert_level,
    } = prev;
    let FrameSignal {
        openness,
        mouth_ratio,
    } = signal;

    if openness < thresholds.critical_openness {
        frame_counter = frame_counter.saturating_add(1);
        if frame_counter >= thresholds.critical_frames {
            alert_level = AlertLevel::Critical;
        } else if frame_counter >= thresholds.low_frames {
            alert_level = alert_level.max(AlertLevel::Low);
        }
    } else if openness < thresholds.low_openness || mouth_ratio > thresholds.yawn_ratio {
        frame_counter = frame_counter.saturating_add(1);
        if frame_counter >= thresholds.low_frames && alert_level == AlertLevel::None {
            alert_level = AlertLevel::Low;
        }
    } else if openness > thresholds.awake_openness() && mouth_ratio < thresholds.awake_mouth_ceiling
    {
        frame_counter = 0;
        alert_level = AlertLevel::None;
    } else if alert_level == AlertLevel::None {
        frame_counter = 0;
    }

    DetectionState {
        frame_counter,
        alert_level,
    }
}

/// Before/after pair produced by one state machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the frame.
    pub previous: DetectionState,
    /// State after the frame.
    pub current: DetectionState,
}

impl Transition {
    /// Returns true if the alert level changed.
    #[must_use]
    pub fn level_changed(&self) -> bool {
        self.previous.alert_level != self.current.alert_level
    }
}

/// Owns the detection state and advances it one frame at a time.
#[derive(Debug, Clone)]
pub struct AlertStateMachine {
    thresholds: Thresholds,
    state: DetectionState,
}

impl AlertStateMachine {
    /// Creates a state machine in the initial state (`None`, counter 0).
    #[must_use]
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: DetectionState::default(),
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> DetectionState {
        self.state
    }

    /// Returns the thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Applies one frame signal.
    pub fn step(&mut self, signal: FrameSignal) -> Transition {
        let previous = self.state;
        let current = transition(previous, signal, &self.thresholds);
        self.state = current;

        let step = Transition { previous, current };
        if step.level_changed() {
            log_level_change(previous.alert_level, current);
        }
        step
    }
}

impl Default for AlertStateMachine {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

fn log_level_change(from: AlertLevel, to: DetectionState) {
    match to.alert_level {
        AlertLevel::Critical => warn!(
            "Drowsiness detected: alert {from} -> CRITICAL after {} frames",
            to.frame_counter
        ),
        AlertLevel::Low => info!(
            "Early warning (eyes closing or yawning): alert {from} -> LOW after {} frames",
            to.frame_counter
        ),
        AlertLevel::None => info!("Driver awake again: alert {from} -> NONE"),
    }
    debug!("Detection state is now {to:?}");
}
