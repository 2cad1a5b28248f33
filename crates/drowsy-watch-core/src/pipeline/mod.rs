//! Frame pipeline: rate limiting, detection, estimation and publication.
//!
//! [`DrowsinessMonitor`] runs one frame at a time on the caller's thread.
//! [`MonitorWorker`] moves a monitor onto a dedicated thread and serializes
//! submissions through a channel.

mod frame;
mod monitor;
mod published;
mod worker;

pub use frame::Frame;
pub use monitor::{analyze_still, DrowsinessMonitor, FrameOutcome, MonitorConfig};
pub use published::{PublishedSnapshot, PublishedState, StateSubscription};
pub use worker::{MonitorWorker, DEFAULT_QUEUE_CAPACITY};
