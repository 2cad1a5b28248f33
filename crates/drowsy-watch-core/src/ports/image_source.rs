//! Frame source port.

use crate::domain::ImageInfo;

/// Port for reading a sequence of frames.
pub trait ImageSource: Send + Sync {
    /// Returns the frames of this source in playback order.
    ///
    /// # Errors
    ///
    /// Individual items may be errors if a frame fails to load.
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInfo>> + Send + '_>;

    /// Returns the total number of frames, if known.
    fn count_hint(&self) -> Option<usize>;
}
