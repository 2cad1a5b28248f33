//! Per-frame analysis steps.
//!
//! Everything here is synchronous: geometry and ratio math are pure, the
//! rate limiter and state machine are plain owned values, and the openness
//! estimator blocks on its classifier.

mod alert;
mod geometry;
mod limiter;
mod mouth;
mod openness;

pub use alert::{transition, AlertStateMachine, Transition};
pub use geometry::{clamp_crop, crop_or_full, distance};
pub use limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use mouth::mouth_ratio;
pub use openness::{to_input_tensor, OpennessEstimator, DEFAULT_INPUT_SIZE};
