//! Face geometry reported by a face detector.

use serde::{Deserialize, Serialize};

/// A 2D point in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the point halfway between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

/// Integer pixel rectangle around a face.
///
/// Detectors may report boxes that extend past the image edges, including
/// negative origins; see [`crate::clamp_crop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl BoundingBox {
    /// Creates a bounding box from origin and size.
    #[must_use]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Creates a bounding box from its left/top and right/bottom edges.
    #[must_use]
    pub const fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }
}

/// A crop rectangle that lies entirely inside its source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub left: u32,
    /// Top edge.
    pub top: u32,
    /// Width in pixels (always > 0).
    pub width: u32,
    /// Height in pixels (always > 0).
    pub height: u32,
}

/// Named facial landmarks consumed by the mouth-ratio estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    /// Left corner of the mouth.
    MouthLeft,
    /// Right corner of the mouth.
    MouthRight,
    /// Bottom of the lower lip.
    MouthBottom,
    /// Base of the nose.
    NoseBase,
}

impl LandmarkKind {
    /// All landmark kinds.
    pub const ALL: [Self; 4] = [
        Self::MouthLeft,
        Self::MouthRight,
        Self::MouthBottom,
        Self::NoseBase,
    ];
}

/// Landmark positions for one face. Any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Landmarks {
    /// Left mouth corner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_left: Option<Point>,
    /// Right mouth corner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_right: Option<Point>,
    /// Bottom of the lower lip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mouth_bottom: Option<Point>,
    /// Base of the nose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nose_base: Option<Point>,
}

impl Landmarks {
    /// Returns the position of a landmark, if it was detected.
    #[must_use]
    pub const fn get(&self, kind: LandmarkKind) -> Option<Point> {
        match kind {
            LandmarkKind::MouthLeft => self.mouth_left,
            LandmarkKind::MouthRight => self.mouth_right,
            LandmarkKind::MouthBottom => self.mouth_bottom,
            LandmarkKind::NoseBase => self.nose_base,
        }
    }

    /// Sets the position of a landmark.
    pub fn set(&mut self, kind: LandmarkKind, point: Point) {
        let slot = match kind {
            LandmarkKind::MouthLeft => &mut self.mouth_left,
            LandmarkKind::MouthRight => &mut self.mouth_right,
            LandmarkKind::MouthBottom => &mut self.mouth_bottom,
            LandmarkKind::NoseBase => &mut self.nose_base,
        };
        *slot = Some(point);
    }

    /// Returns a copy with the given landmark set.
    #[must_use]
    pub fn with(mut self, kind: LandmarkKind, point: Point) -> Self {
        self.set(kind, point);
        self
    }

    /// Returns true if all four landmarks are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        LandmarkKind::ALL.iter().all(|&k| self.get(k).is_some())
    }
}

/// One face found by a detector (bounding box plus landmarks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    /// Face bounding box in source-image pixels.
    pub bbox: BoundingBox,
    /// Landmark positions in the same coordinate space.
    #[serde(default)]
    pub landmarks: Landmarks,
}

impl DetectedFace {
    /// Creates a face with no landmarks.
    #[must_use]
    pub fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            landmarks: Landmarks::default(),
        }
    }

    /// Sets the landmarks.
    #[must_use]
    pub const fn with_landmarks(mut self, landmarks: Landmarks) -> Self {
        self.landmarks = landmarks;
        self
    }
}
