//! Error types for the detection pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// A face box that leaves nothing to crop once clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CropError {
    /// The clamped width or height is zero or negative.
    #[error("invalid crop: clamped size is {width}x{height}")]
    InvalidCrop {
        /// Clamped width (may be negative).
        width: i64,
        /// Clamped height (may be negative).
        height: i64,
    },
}

/// Transient failures that abort a single frame.
///
/// The frame is skipped, the published state is left untouched and the next
/// frame is processed independently.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The face detector reported a failure.
    #[error("face detection failed: {0:#}")]
    Detector(anyhow::Error),

    /// The image classifier raised a fault.
    #[error("classifier invocation failed: {0:#}")]
    Classifier(anyhow::Error),

    /// The classifier returned no output values.
    #[error("classifier produced an empty output buffer")]
    EmptyOutput,

    /// The classifier returned `NaN` or an infinite value.
    #[error("classifier produced a non-finite openness value: {0}")]
    NonFiniteOutput(f32),
}

/// Fatal start-up failures: no pipeline can run without its model artifacts.
#[derive(Debug, Error)]
pub enum InitError {
    /// A required model artifact does not exist.
    #[error("missing model artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// The label list exists but contains no labels.
    #[error("label list is empty: {}", .0.display())]
    EmptyLabels(PathBuf),

    /// The model weights could not be loaded.
    #[error("failed to load model {}: {reason:#}", .path.display())]
    Model {
        /// Path of the weights file.
        path: PathBuf,
        /// Underlying loader error.
        reason: anyhow::Error,
    },
}

/// A threshold value outside its accepted range.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name} must be {expected}, got {value}")]
pub struct ThresholdError {
    /// Name of the offending threshold.
    pub name: &'static str,
    /// Human-readable description of the accepted range.
    pub expected: &'static str,
    /// The rejected value.
    pub value: String,
}

impl ThresholdError {
    pub(crate) fn new(name: &'static str, expected: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            expected,
            value: value.to_string(),
        }
    }
}
