//! Drowsy Watch Core - frame pipeline and alert state machine
//!
//! This crate turns a stream of camera frames into a stable three-level
//! drowsiness alert. Each admitted frame is reduced to two signals (eye
//! openness from an image classifier, mouth-aspect ratio from facial
//! landmarks) and fed through a hysteresis state machine whose output is
//! published on read-only watch channels.

pub mod analysis;
pub mod domain;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod ports;

pub use analysis::{
    clamp_crop, distance, mouth_ratio, transition, AlertStateMachine, OpennessEstimator,
    RateLimiter, Transition,
};
pub use domain::{
    AlertLevel, BoundingBox, CropRect, DetectedFace, DetectionState, FrameReport, FrameSignal,
    ImageInfo, LandmarkKind, Landmarks, OutcomeKind, Point, SessionSummary, StillVerdict,
    Thresholds,
};
pub use error::{CropError, InitError, PipelineError, ThresholdError};
pub use pipeline::{
    analyze_still, DrowsinessMonitor, Frame, FrameOutcome, MonitorConfig, MonitorWorker,
    PublishedSnapshot, PublishedState, StateSubscription,
};
pub use ports::{
    FaceDetector, ImageClassifier, ImageSource, ImageTensor, MonitorEvent, ProgressSink,
    ReportOutput,
};
