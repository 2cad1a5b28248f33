//! Synthetic frame and pose builders for testing.

// Pixel math on small synthetic images.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use std::path::{Path, PathBuf};

use anyhow::Context;
use drowsy_watch_core::domain::{
    BoundingBox, DetectedFace, ImageInfo, LandmarkKind, Landmarks, Point,
};
use image::{DynamicImage, Rgb, RgbImage};

/// Builder for synthetic camera frames.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// Creates a uniform RGB frame.
    #[must_use]
    pub fn uniform(width: u32, height: u32, value: u8) -> ImageInfo {
        let img = RgbImage::from_pixel(width, height, Rgb([value; 3]));
        ImageInfo::new("synthetic://uniform", DynamicImage::ImageRgb8(img))
    }

    /// Creates a frame with a light elliptical "face" on a dark background.
    #[must_use]
    pub fn face_like(width: u32, height: u32) -> ImageInfo {
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let (rx, ry) = (width as f32 / 4.0, height as f32 / 3.0);
        let img = RgbImage::from_fn(width, height, |x, y| {
            let dx = (x as f32 - cx) / rx;
            let dy = (y as f32 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                Rgb([224, 180, 150])
            } else {
                Rgb([30, 30, 40])
            }
        });
        ImageInfo::new("synthetic://face_like", DynamicImage::ImageRgb8(img))
    }

    /// Creates the `index`-th frame of a replayed sequence, named `frame_NNNN.png`.
    #[must_use]
    pub fn frame(index: usize, width: u32, height: u32) -> ImageInfo {
        let mut info = Self::face_like(width, height);
        info.path = Self::frame_name(index);
        info
    }

    /// Returns the file name used for the `index`-th frame.
    #[must_use]
    pub fn frame_name(index: usize) -> String {
        format!("frame_{index:04}.png")
    }

    /// Writes `count` face-like PNG frames into `dir` and returns their paths.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub fn write_frames(
        dir: &Path,
        count: usize,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Vec<PathBuf>> {
        (0..count)
            .map(|i| {
                let path = dir.join(Self::frame_name(i));
                Self::face_like(width, height)
                    .image
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                Ok(path)
            })
            .collect()
    }
}

/// Builder for a single detected face with mouth landmarks.
///
/// Landmarks are placed so the mouth ratio equals the configured value:
/// the mouth corners are `mouth_width` apart and the nose sits
/// `2 * ratio * mouth_width` above the lower lip.
#[derive(Debug, Clone)]
pub struct PoseBuilder {
    bbox: BoundingBox,
    ratio: Option<f64>,
}

impl PoseBuilder {
    /// Starts a face with the given box and a closed mouth.
    #[must_use]
    pub const fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            ratio: Some(0.2),
        }
    }

    /// Starts a face covering the middle half of a `width`x`height` frame.
    #[must_use]
    pub const fn centered(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        Self::new(BoundingBox::new(w / 4, h / 4, w / 2, h / 2))
    }

    /// Sets the mouth ratio.
    #[must_use]
    pub const fn mouth_ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    /// A wide-open mouth (ratio 0.8).
    #[must_use]
    pub const fn yawning(self) -> Self {
        self.mouth_ratio(0.8)
    }

    /// A mouth between the awake ceiling and the yawn ratio (0.55).
    #[must_use]
    pub const fn half_open(self) -> Self {
        self.mouth_ratio(0.55)
    }

    /// Omits all landmarks.
    #[must_use]
    pub const fn without_landmarks(mut self) -> Self {
        self.ratio = None;
        self
    }

    /// Builds the face.
    #[must_use]
    pub fn build(&self) -> DetectedFace {
        let face = DetectedFace::new(self.bbox);
        let Some(ratio) = self.ratio else {
            return face;
        };

        let width = self.bbox.width.max(4) as f32 / 2.0;
        let cx = self.bbox.left as f32 + self.bbox.width as f32 / 2.0;
        let lip = self.bbox.top as f32 + self.bbox.height as f32 * 0.85;
        let nose = lip - 2.0 * ratio as f32 * width;

        let landmarks = Landmarks::default()
            .with(LandmarkKind::MouthLeft, Point::new(cx - width / 2.0, lip - 5.0))
            .with(LandmarkKind::MouthRight, Point::new(cx + width / 2.0, lip - 5.0))
            .with(LandmarkKind::MouthBottom, Point::new(cx, lip))
            .with(LandmarkKind::NoseBase, Point::new(cx, nose));
        face.with_landmarks(landmarks)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drowsy_watch_core::analysis::mouth_ratio;

    use super::*;

    #[test]
    fn test_uniform_dimensions() {
        let info = SyntheticImageBuilder::uniform(64, 32, 7);
        assert_eq!((info.width, info.height), (64, 32));
        assert_eq!(info.image.to_rgb8().get_pixel(3, 3), &Rgb([7, 7, 7]));
    }

    #[test]
    fn test_face_like_has_face_in_center() {
        let info = SyntheticImageBuilder::face_like(100, 100);
        let rgb = info.image.to_rgb8();
        assert_eq!(rgb.get_pixel(50, 50), &Rgb([224, 180, 150]));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([30, 30, 40]));
    }

    #[test]
    fn test_frame_naming() {
        assert_eq!(SyntheticImageBuilder::frame(7, 8, 8).path, "frame_0007.png");
    }

    #[test]
    fn test_write_frames() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SyntheticImageBuilder::write_frames(dir.path(), 2, 16, 16).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_pose_ratios() {
        let pose = PoseBuilder::centered(200, 200);
        for (builder, expected) in [
            (pose.clone(), 0.2),
            (pose.clone().yawning(), 0.8),
            (pose.clone().half_open(), 0.55),
        ] {
            let ratio = mouth_ratio(&builder.build().landmarks);
            assert!((ratio - expected).abs() < 1e-4, "{ratio} != {expected}");
        }
    }

    #[test]
    fn test_pose_without_landmarks() {
        let face = PoseBuilder::centered(100, 100).without_landmarks().build();
        assert!(mouth_ratio(&face.landmarks).abs() < f64::EPSILON);
        assert_eq!(face.bbox, BoundingBox::new(25, 25, 50, 50));
    }
}
