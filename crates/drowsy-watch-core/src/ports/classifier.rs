//! Image classifier port.

use std::sync::Arc;

/// Normalized image data in height-width-channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel.
    pub channels: u32,
    /// `height * width * channels` values.
    pub data: Vec<f32>,
}

impl ImageTensor {
    /// Returns the value at `(x, y, channel)`, if in range.
    #[must_use]
    pub fn get(&self, x: u32, y: u32, channel: u32) -> Option<f32> {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return None;
        }
        let index = (y as usize * self.width as usize + x as usize) * self.channels as usize
            + channel as usize;
        self.data.get(index).copied()
    }
}

/// Port for a single-input image classifier.
///
/// Slot 0 of the output holds the eye-openness probability.
pub trait ImageClassifier: Send + Sync {
    /// Side length of the square input the classifier expects.
    fn input_size(&self) -> u32;

    /// Runs the classifier on a preprocessed input.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails.
    fn classify(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>>;
}

impl<T: ImageClassifier + ?Sized> ImageClassifier for Box<T> {
    fn input_size(&self) -> u32 {
        (**self).input_size()
    }

    fn classify(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        (**self).classify(input)
    }
}

impl<T: ImageClassifier + ?Sized> ImageClassifier for Arc<T> {
    fn input_size(&self) -> u32 {
        (**self).input_size()
    }

    fn classify(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        (**self).classify(input)
    }
}
