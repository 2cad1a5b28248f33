//! Eye-openness estimation from a face crop.
//!
//! The face box is clamped to the frame, the crop is resized to the
//! classifier's square input with bilinear filtering, and each RGB channel
//! is normalized to `[-1, 1]` via `(v - 127.5) / 127.5`. Slot 0 of the
//! classifier output is the openness probability.

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, trace};

use super::geometry::crop_or_full;
use crate::domain::BoundingBox;
use crate::error::PipelineError;
use crate::ports::{ImageClassifier, ImageTensor};

/// Side length of the eye-openness model input.
pub const DEFAULT_INPUT_SIZE: u32 = 160;

const NORMALIZE_MEAN: f32 = 127.5;
const NORMALIZE_STD: f32 = 127.5;

/// Resizes `image` to `size`x`size` and normalizes it into an RGB tensor.
#[must_use]
pub fn to_input_tensor(image: &DynamicImage, size: u32) -> ImageTensor {
    let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();
    let data = rgb
        .as_raw()
        .iter()
        .map(|&v| (f32::from(v) - NORMALIZE_MEAN) / NORMALIZE_STD)
        .collect();

    ImageTensor {
        width: size,
        height: size,
        channels: 3,
        data,
    }
}

/// Wraps an [`ImageClassifier`] and turns a face crop into an openness value.
#[derive(Debug)]
pub struct OpennessEstimator<C> {
    classifier: C,
}

impl<C: ImageClassifier> OpennessEstimator<C> {
    /// Creates an estimator around a loaded classifier.
    #[must_use]
    pub const fn new(classifier: C) -> Self {
        Self { classifier }
    }

    /// Returns the wrapped classifier.
    #[must_use]
    pub const fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Crops `image` to `bbox` and builds the classifier input.
    ///
    /// Falls back to the whole image if the clamped box is empty.
    #[must_use]
    pub fn preprocess(&self, image: &DynamicImage, bbox: BoundingBox) -> ImageTensor {
        let crop = crop_or_full(image, bbox);
        to_input_tensor(&crop, self.classifier.input_size())
    }

    /// Estimates the probability that the eyes in `bbox` are open.
    ///
    /// The result is clamped to `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Classifier`] if inference fails,
    /// [`PipelineError::EmptyOutput`] if the classifier returns nothing and
    /// [`PipelineError::NonFiniteOutput`] if slot 0 is `NaN` or infinite.
    pub fn estimate(&self, image: &DynamicImage, bbox: BoundingBox) -> Result<f64, PipelineError> {
        let input = self.preprocess(image, bbox);
        let output = self
            .classifier
            .classify(&input)
            .map_err(PipelineError::Classifier)?;
        trace!("Classifier output: {output:?}");

        let raw = *output.first().ok_or(PipelineError::EmptyOutput)?;
        if !raw.is_finite() {
            return Err(PipelineError::NonFiniteOutput(raw));
        }

        let openness = f64::from(raw).clamp(0.0, 1.0);
        debug!("Openness {openness:.3} for face {bbox:?}");
        Ok(openness)
    }
}
