//! Camera frames that release their buffer exactly once.

use std::fmt;
use std::time::Instant;

use crate::domain::ImageInfo;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A camera frame plus its capture timestamp.
///
/// An optional release callback hands the frame buffer back to its producer.
/// It runs when the frame is dropped, so every path through the pipeline
/// releases the frame exactly once.
pub struct Frame {
    info: ImageInfo,
    timestamp: Instant,
    release: Option<ReleaseFn>,
}

impl Frame {
    /// Creates a frame with no release callback.
    #[must_use]
    pub const fn new(info: ImageInfo, timestamp: Instant) -> Self {
        Self {
            info,
            timestamp,
            release: None,
        }
    }

    /// Sets the callback run when the frame is dropped.
    ///
    /// A previously set callback is run immediately.
    #[must_use]
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        if let Some(previous) = self.release.replace(Box::new(release)) {
            previous();
        }
        self
    }

    /// Returns the decoded image.
    #[must_use]
    pub const fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Returns the capture timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("path", &self.info.path)
            .field("width", &self.info.width)
            .field("height", &self.info.height)
            .field("timestamp", &self.timestamp)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}
