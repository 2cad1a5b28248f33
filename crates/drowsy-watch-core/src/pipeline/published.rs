//! Observable openness, mouth ratio and alert level.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::domain::{AlertLevel, FrameSignal};

/// The three published values at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PublishedSnapshot {
    /// Latest eye openness.
    pub openness: f64,
    /// Latest mouth ratio.
    pub mouth_ratio: f64,
    /// Current alert level.
    pub alert_level: AlertLevel,
}

impl Default for PublishedSnapshot {
    fn default() -> Self {
        Self {
            openness: FrameSignal::NO_FACE.openness,
            mouth_ratio: FrameSignal::NO_FACE.mouth_ratio,
            alert_level: AlertLevel::None,
        }
    }
}

/// Single writer of the published values.
///
/// Each value lives in its own watch channel, so consumers may observe the
/// three updates of one frame in any order. Writing a value equal to the
/// current one does not notify subscribers.
#[derive(Debug)]
pub struct PublishedState {
    openness: watch::Sender<f64>,
    mouth_ratio: watch::Sender<f64>,
    alert_level: watch::Sender<AlertLevel>,
}

impl PublishedState {
    /// Creates the state with its initial values (1.0, 0.0, `None`).
    #[must_use]
    pub fn new() -> Self {
        let initial = PublishedSnapshot::default();
        let (openness, _) = watch::channel(initial.openness);
        let (mouth_ratio, _) = watch::channel(initial.mouth_ratio);
        let (alert_level, _) = watch::channel(initial.alert_level);
        Self {
            openness,
            mouth_ratio,
            alert_level,
        }
    }

    /// Returns read-only handles to the published values.
    #[must_use]
    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            openness: self.openness.subscribe(),
            mouth_ratio: self.mouth_ratio.subscribe(),
            alert_level: self.alert_level.subscribe(),
        }
    }

    /// Returns the current values.
    #[must_use]
    pub fn snapshot(&self) -> PublishedSnapshot {
        PublishedSnapshot {
            openness: *self.openness.borrow(),
            mouth_ratio: *self.mouth_ratio.borrow(),
            alert_level: *self.alert_level.borrow(),
        }
    }

    pub(crate) fn publish(&self, signal: FrameSignal, level: AlertLevel) {
        set_if_changed(&self.openness, signal.openness);
        set_if_changed(&self.mouth_ratio, signal.mouth_ratio);
        set_if_changed(&self.alert_level, level);
    }
}

impl Default for PublishedState {
    fn default() -> Self {
        Self::new()
    }
}

fn set_if_changed<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

/// Read-only view of the published values.
///
/// Use `borrow()` on a receiver for the latest value or `changed().await`
/// to wait for the next update.
#[derive(Debug, Clone)]
pub struct StateSubscription {
    /// Eye openness.
    pub openness: watch::Receiver<f64>,
    /// Mouth ratio.
    pub mouth_ratio: watch::Receiver<f64>,
    /// Alert level.
    pub alert_level: watch::Receiver<AlertLevel>,
}

impl StateSubscription {
    /// Returns the latest values without marking them seen.
    #[must_use]
    pub fn snapshot(&self) -> PublishedSnapshot {
        PublishedSnapshot {
            openness: *self.openness.borrow(),
            mouth_ratio: *self.mouth_ratio.borrow(),
            alert_level: *self.alert_level.borrow(),
        }
    }
}
