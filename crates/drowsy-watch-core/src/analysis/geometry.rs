//! Point distance and crop clamping.

// Clamped values are checked to be in range before narrowing.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::borrow::Cow;

use image::DynamicImage;
use tracing::warn;

use crate::domain::{BoundingBox, CropRect, Point};
use crate::error::CropError;

/// Euclidean distance between two points.
#[must_use]
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = f64::from(p2.x) - f64::from(p1.x);
    let dy = f64::from(p2.y) - f64::from(p1.y);
    dx.hypot(dy)
}

/// Clamps a face box to the source image.
///
/// The origin is clamped to be non-negative and the size is shrunk so the
/// crop stays inside the source. The size is not grown to compensate for a
/// clamped origin.
///
/// # Errors
///
/// Returns [`CropError::InvalidCrop`] if the clamped width or height is zero
/// or negative.
pub fn clamp_crop(
    source_width: u32,
    source_height: u32,
    bbox: BoundingBox,
) -> Result<CropRect, CropError> {
    let left = i64::from(bbox.left).max(0);
    let top = i64::from(bbox.top).max(0);
    let width = (i64::from(source_width) - left).min(i64::from(bbox.width));
    let height = (i64::from(source_height) - top).min(i64::from(bbox.height));

    if width <= 0 || height <= 0 {
        return Err(CropError::InvalidCrop { width, height });
    }

    // 0 <= left < left + width <= source_width, same for top.
    Ok(CropRect {
        left: left as u32,
        top: top as u32,
        width: width as u32,
        height: height as u32,
    })
}

/// Crops `image` to the clamped face box, or returns the whole image if the
/// box leaves nothing to crop.
#[must_use]
pub fn crop_or_full(image: &DynamicImage, bbox: BoundingBox) -> Cow<'_, DynamicImage> {
    match clamp_crop(image.width(), image.height(), bbox) {
        Ok(rect) => Cow::Owned(image.crop_imm(rect.left, rect.top, rect.width, rect.height)),
        Err(e) => {
            warn!("{e} for box {bbox:?}, using the uncropped image");
            Cow::Borrowed(image)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let d = distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-9);
        assert!(distance(Point::new(2.0, 2.0), Point::new(2.0, 2.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_crop_inside_image() {
        let rect = clamp_crop(100, 80, BoundingBox::new(10, 20, 30, 40));
        assert_eq!(
            rect,
            Ok(CropRect {
                left: 10,
                top: 20,
                width: 30,
                height: 40
            })
        );
    }

    #[test]
    fn test_crop_negative_origin() {
        // Origin is clamped to zero, size is kept.
        let rect = clamp_crop(100, 100, BoundingBox::new(-10, -5, 50, 50));
        assert_eq!(
            rect,
            Ok(CropRect {
                left: 0,
                top: 0,
                width: 50,
                height: 50
            })
        );
    }

    #[test]
    fn test_crop_overflowing_right_and_bottom() {
        let rect = clamp_crop(100, 60, BoundingBox::new(80, 40, 50, 50));
        assert_eq!(
            rect,
            Ok(CropRect {
                left: 80,
                top: 40,
                width: 20,
                height: 20
            })
        );
    }

    #[test]
    fn test_crop_entirely_outside() {
        assert_eq!(
            clamp_crop(100, 100, BoundingBox::new(150, 10, 20, 20)),
            Err(CropError::InvalidCrop {
                width: -50,
                height: 20
            })
        );
        assert!(clamp_crop(100, 100, BoundingBox::new(10, 10, 0, 20)).is_err());
        assert!(clamp_crop(100, 100, BoundingBox::new(10, 10, 20, -3)).is_err());
        assert!(clamp_crop(0, 0, BoundingBox::new(0, 0, 10, 10)).is_err());
    }

    #[test]
    fn test_crop_never_exceeds_source() {
        let boxes = [
            BoundingBox::new(-100, -100, 1000, 1000),
            BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX),
            BoundingBox::new(99, 99, i32::MAX, i32::MAX),
            BoundingBox::new(0, 0, 1, 1),
        ];
        for bbox in boxes {
            if let Ok(rect) = clamp_crop(100, 100, bbox) {
                assert!(rect.left + rect.width <= 100, "{bbox:?} -> {rect:?}");
                assert!(rect.top + rect.height <= 100, "{bbox:?} -> {rect:?}");
                assert!(rect.width > 0 && rect.height > 0);
            }
        }
    }

    #[test]
    fn test_crop_or_full_falls_back() {
        let image = DynamicImage::new_rgb8(40, 30);

        let cropped = crop_or_full(&image, BoundingBox::new(5, 5, 10, 10));
        assert_eq!((cropped.width(), cropped.height()), (10, 10));

        let full = crop_or_full(&image, BoundingBox::new(100, 100, 10, 10));
        assert!(matches!(full, Cow::Borrowed(_)));
        assert_eq!((full.width(), full.height()), (40, 30));
    }
}
