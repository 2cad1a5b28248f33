//! Face detector port.

use std::sync::Arc;

use crate::domain::{DetectedFace, ImageInfo};

/// Port for locating faces and their landmarks in an image.
pub trait FaceDetector: Send + Sync {
    /// Detects faces in `image`.
    ///
    /// Bounding boxes and landmarks are in the image's pixel coordinates.
    /// Boxes may extend past the image edges. An empty list means no face.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails.
    fn detect(&self, image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for Box<T> {
    fn detect(&self, image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>> {
        (**self).detect(image)
    }
}

impl<T: FaceDetector + ?Sized> FaceDetector for Arc<T> {
    fn detect(&self, image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>> {
        (**self).detect(image)
    }
}
