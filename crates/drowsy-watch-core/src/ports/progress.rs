//! Monitoring progress port for UI integration.

use crate::domain::{AlertLevel, FrameReport, SessionSummary};

/// Events emitted while a frame sequence is monitored.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// Monitoring started.
    Started {
        /// Number of frames, if known.
        total: Option<usize>,
    },
    /// A frame was processed (or throttled, or failed).
    Frame {
        /// The frame's report.
        report: FrameReport,
    },
    /// The published alert level changed.
    AlertChanged {
        /// Index of the frame that caused the change.
        index: usize,
        /// Level before the frame.
        from: AlertLevel,
        /// Level after the frame.
        to: AlertLevel,
    },
    /// All frames have been processed.
    Finished {
        /// Session totals.
        summary: SessionSummary,
    },
}

/// Port for receiving monitoring events.
pub trait ProgressSink: Send + Sync {
    /// Called when a monitoring event occurs.
    fn on_event(&self, event: MonitorEvent);
}
