//! Core domain types for drowsiness detection.

mod alert;
mod face;
mod image;
mod report;

pub use alert::{AlertLevel, DetectionState, FrameSignal, Thresholds};
pub use face::{BoundingBox, CropRect, DetectedFace, LandmarkKind, Landmarks, Point};
pub use image::{ImageDimensions, ImageInfo};
pub use report::{FrameReport, OutcomeKind, SessionSummary, StillVerdict};
