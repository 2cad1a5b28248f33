//! `BlazeFace` short-range face detector.
//!
//! Follows "`BlazeFace`: Sub-millisecond Neural Face Detection on Mobile GPUs"
//! with the weight layout of <https://github.com/hollance/BlazeFace-PyTorch>
//! (`BatchNorm` folded into convolution biases). The detector predicts a box
//! and six keypoints per anchor. Only the box and the nose keypoint map onto
//! [`Landmarks`]: the model has no mouth-corner keypoints, so frames analyzed
//! with it always report a mouth ratio of 0.0.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::cmp::Ordering;

use anyhow::{Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};
use tracing::{debug, trace};

use super::sigmoid;
use crate::analysis::to_input_tensor;
use crate::domain::{BoundingBox, DetectedFace, ImageInfo, LandmarkKind, Landmarks, Point};
use crate::ports::FaceDetector;

/// Side length of the detector input.
pub const BLAZEFACE_INPUT_SIZE: u32 = 128;

/// Minimum sigmoid score for a detection to be kept.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.75;

/// Overlap above which the weaker of two detections is suppressed.
const NMS_IOU: f32 = 0.3;

/// Keypoint slot of the nose tip.
const NOSE_KEYPOINT: usize = 2;

const NUM_KEYPOINTS: usize = 6;

/// Values regressed per anchor: box (4) plus keypoints (2 each).
const REGRESSION_WIDTH: usize = 4 + 2 * NUM_KEYPOINTS;

/// `(in_channels, out_channels, stride)` for the 16x16 backbone.
const BACKBONE_16: [(usize, usize, usize); 11] = [
    (24, 24, 1),
    (24, 28, 1),
    (28, 32, 2),
    (32, 36, 1),
    (36, 42, 1),
    (42, 48, 2),
    (48, 56, 1),
    (56, 64, 1),
    (64, 72, 1),
    (72, 80, 1),
    (80, 88, 1),
];

/// `(in_channels, out_channels, stride)` for the 8x8 backbone.
const BACKBONE_8: [(usize, usize, usize); 5] = [
    (88, 96, 2),
    (96, 96, 1),
    (96, 96, 1),
    (96, 96, 1),
    (96, 96, 1),
];

/// `(grid side, anchors per cell)` for the two detection heads.
const HEADS: [(usize, usize); 2] = [(16, 2), (8, 6)];

/// Depthwise-separable residual block.
struct BlazeBlock {
    depthwise: Conv2d,
    pointwise: Conv2d,
    extra_channels: usize,
    downsample: bool,
}

impl BlazeBlock {
    fn load(vb: &VarBuilder, (in_c, out_c, stride): (usize, usize, usize)) -> Result<Self> {
        let downsample = stride == 2;
        let depthwise = conv2d(
            in_c,
            in_c,
            3,
            Conv2dConfig {
                stride,
                padding: usize::from(!downsample),
                groups: in_c,
                ..Conv2dConfig::default()
            },
            vb.pp("depthwise"),
        )?;
        let pointwise = conv2d(in_c, out_c, 1, Conv2dConfig::default(), vb.pp("pointwise"))?;

        Ok(Self {
            depthwise,
            pointwise,
            extra_channels: out_c.saturating_sub(in_c),
            downsample,
        })
    }
}

impl Module for BlazeBlock {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (branch_in, shortcut) = if self.downsample {
            // TF-style "same" padding: pad right and bottom only.
            let padded = x.pad_with_zeros(2, 0, 2)?.pad_with_zeros(3, 0, 2)?;
            (padded, x.max_pool2d(2)?)
        } else {
            (x.clone(), x.clone())
        };

        let branch = self.depthwise.forward(&branch_in)?.relu()?;
        let branch = self.pointwise.forward(&branch)?;

        let shortcut = if self.extra_channels > 0 {
            shortcut.pad_with_zeros(1, 0, self.extra_channels)?
        } else {
            shortcut
        };
        (branch + shortcut)?.relu()
    }
}

/// One detection head: a score and a regression convolution.
struct Head {
    classifier: Conv2d,
    regressor: Conv2d,
    anchors: usize,
}

impl Head {
    fn load(vb: &VarBuilder, channels: usize, (side, per_cell): (usize, usize)) -> Result<Self> {
        let classifier = conv2d(
            channels,
            per_cell,
            1,
            Conv2dConfig::default(),
            vb.pp(format!("classifier_{side}")),
        )?;
        let regressor = conv2d(
            channels,
            per_cell * REGRESSION_WIDTH,
            1,
            Conv2dConfig::default(),
            vb.pp(format!("regressor_{side}")),
        )?;
        Ok(Self {
            classifier,
            regressor,
            anchors: side * side * per_cell,
        })
    }

    /// Returns `(scores, regression)` shaped `(anchors,)` and `(anchors, 16)`.
    fn run(&self, features: &Tensor) -> candle_core::Result<(Tensor, Tensor)> {
        let scores = self
            .classifier
            .forward(features)?
            .permute((0, 2, 3, 1))?
            .reshape(self.anchors)?;
        let regression = self
            .regressor
            .forward(features)?
            .permute((0, 2, 3, 1))?
            .reshape((self.anchors, REGRESSION_WIDTH))?;
        Ok((scores, regression))
    }
}

/// A decoded detection in normalized `[0, 1]` image coordinates.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    score: f32,
    /// `[x_min, y_min, x_max, y_max]`.
    bounds: [f32; 4],
    keypoints: [[f32; 2]; NUM_KEYPOINTS],
}

/// `BlazeFace` detector implementing [`FaceDetector`].
pub struct BlazeFace {
    stem: Conv2d,
    backbone_16: Vec<BlazeBlock>,
    backbone_8: Vec<BlazeBlock>,
    head_16: Head,
    head_8: Head,
    anchors: Vec<[f32; 2]>,
    score_threshold: f32,
    device: Device,
}

impl BlazeFace {
    /// Builds the detector from weights.
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    pub fn new(vb: &VarBuilder) -> Result<Self> {
        let stem = conv2d(
            3,
            24,
            5,
            Conv2dConfig {
                stride: 2,
                ..Conv2dConfig::default()
            },
            vb.pp("conv0"),
        )
        .context("Failed to load BlazeFace stem")?;

        let load_blocks = |prefix: &str, table: &[(usize, usize, usize)]| -> Result<Vec<_>> {
            table
                .iter()
                .enumerate()
                .map(|(i, &shape)| {
                    BlazeBlock::load(&vb.pp(format!("{prefix}.{i}")), shape)
                        .with_context(|| format!("Failed to load {prefix}.{i}"))
                })
                .collect()
        };
        let backbone_16 = load_blocks("backbone1", &BACKBONE_16)?;
        let backbone_8 = load_blocks("backbone2", &BACKBONE_8)?;

        let head_16 = Head::load(vb, 88, HEADS[0])?;
        let head_8 = Head::load(vb, 96, HEADS[1])?;

        Ok(Self {
            stem,
            backbone_16,
            backbone_8,
            head_16,
            head_8,
            anchors: anchor_centers(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            device: vb.device().clone(),
        })
    }

    /// Sets the minimum detection score.
    #[must_use]
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    fn input(&self, image: &image::DynamicImage) -> Result<Tensor> {
        let size = BLAZEFACE_INPUT_SIZE as usize;
        let pixels = to_input_tensor(image, BLAZEFACE_INPUT_SIZE);
        Tensor::from_vec(pixels.data, (1, size, size, 3), &self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()
            .context("Failed to build BlazeFace input")
    }

    /// Returns `(scores, regression)` for all anchors.
    fn run(&self, x: &Tensor) -> Result<(Vec<f32>, Vec<Vec<f32>>)> {
        let x = x.pad_with_zeros(2, 1, 2)?.pad_with_zeros(3, 1, 2)?;
        let mut h = self.stem.forward(&x)?.relu()?;
        for block in &self.backbone_16 {
            h = block.forward(&h)?;
        }
        let (scores_16, boxes_16) = self.head_16.run(&h)?;
        for block in &self.backbone_8 {
            h = block.forward(&h)?;
        }
        let (scores_8, boxes_8) = self.head_8.run(&h)?;

        let scores = Tensor::cat(&[scores_16, scores_8], 0)?.to_vec1::<f32>()?;
        let boxes = Tensor::cat(&[boxes_16, boxes_8], 0)?.to_vec2::<f32>()?;
        Ok((scores, boxes))
    }

    fn decode(&self, scores: &[f32], boxes: &[Vec<f32>]) -> Vec<Candidate> {
        let scale = BLAZEFACE_INPUT_SIZE as f32;
        let unit = |v: f32| v.clamp(0.0, 1.0);

        let candidates = self
            .anchors
            .iter()
            .zip(scores.iter().zip(boxes))
            .filter_map(|(&[ax, ay], (&logit, raw))| {
                let score = sigmoid(logit);
                if score < self.score_threshold || raw.len() < REGRESSION_WIDTH {
                    return None;
                }
                let cx = ax + raw[0] / scale;
                let cy = ay + raw[1] / scale;
                let (half_w, half_h) = (raw[2] / scale / 2.0, raw[3] / scale / 2.0);

                let mut keypoints = [[0.0; 2]; NUM_KEYPOINTS];
                for (k, point) in keypoints.iter_mut().enumerate() {
                    let offset = 4 + 2 * k;
                    *point = [
                        unit(ax + raw[offset] / scale),
                        unit(ay + raw[offset + 1] / scale),
                    ];
                }

                Some(Candidate {
                    score,
                    bounds: [
                        unit(cx - half_w),
                        unit(cy - half_h),
                        unit(cx + half_w),
                        unit(cy + half_h),
                    ],
                    keypoints,
                })
            })
            .collect();

        suppress(candidates)
    }
}

impl FaceDetector for BlazeFace {
    fn detect(&self, image: &ImageInfo) -> Result<Vec<DetectedFace>> {
        let x = self.input(image)?;
        let (scores, boxes) = self.run(&x).context("BlazeFace inference failed")?;
        let candidates = self.decode(&scores, &boxes);
        debug!("BlazeFace found {} faces in {}", candidates.len(), image.path);

        Ok(candidates
            .iter()
            .map(|c| {
                trace!("Face score {:.3} at {:?}", c.score, c.bounds);
                to_face(c, image.width, image.height)
            })
            .collect())
    }
}

/// Anchor centers for both heads, in head order.
fn anchor_centers() -> Vec<[f32; 2]> {
    HEADS
        .iter()
        .flat_map(|&(side, per_cell)| {
            (0..side * side).flat_map(move |cell| {
                let cx = ((cell % side) as f32 + 0.5) / side as f32;
                let cy = ((cell / side) as f32 + 0.5) / side as f32;
                std::iter::repeat([cx, cy]).take(per_cell)
            })
        })
        .collect()
}

/// Greedy non-maximum suppression, strongest first.
fn suppress(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(&k.bounds, &candidate.bounds) < NMS_IOU) {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two `[x_min, y_min, x_max, y_max]` boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let overlap_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let overlap_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let intersection = overlap_w * overlap_h;

    let area = |r: &[f32; 4]| (r[2] - r[0]) * (r[3] - r[1]);
    let union = area(a) + area(b) - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Scales a normalized candidate to pixel coordinates.
fn to_face(candidate: &Candidate, width: u32, height: u32) -> DetectedFace {
    let (w, h) = (width as f32, height as f32);
    let [x_min, y_min, x_max, y_max] = candidate.bounds;
    let bbox = BoundingBox::from_edges(
        (x_min * w).round() as i32,
        (y_min * h).round() as i32,
        (x_max * w).round() as i32,
        (y_max * h).round() as i32,
    );

    let [nx, ny] = candidate.keypoints[NOSE_KEYPOINT];
    let landmarks = Landmarks::default().with(LandmarkKind::NoseBase, Point::new(nx * w, ny * h));
    DetectedFace::new(bbox).with_landmarks(landmarks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: f32, bounds: [f32; 4]) -> Candidate {
        Candidate {
            score,
            bounds,
            keypoints: [[0.5, 0.5]; NUM_KEYPOINTS],
        }
    }

    #[test]
    fn test_anchor_layout() {
        let anchors = anchor_centers();
        assert_eq!(anchors.len(), 16 * 16 * 2 + 8 * 8 * 6);
        assert_eq!(anchors[0], [0.5 / 16.0, 0.5 / 16.0]);
        assert_eq!(anchors[1], anchors[0]);
        assert_eq!(anchors[2], [1.5 / 16.0, 0.5 / 16.0]);
        assert_eq!(anchors[512], [0.5 / 8.0, 0.5 / 8.0]);
        assert_eq!(anchors[895], [7.5 / 8.0, 7.5 / 8.0]);
    }

    #[test]
    fn test_iou() {
        assert!(iou(&[0.0, 0.0, 0.5, 0.5], &[0.6, 0.6, 1.0, 1.0]).abs() < 1e-6);
        assert!((iou(&[0.0, 0.0, 1.0, 1.0], &[0.0, 0.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);

        // Intersection 0.0625, union 0.4375.
        let partial = iou(&[0.0, 0.0, 0.5, 0.5], &[0.25, 0.25, 0.75, 0.75]);
        assert!((partial - 0.0625 / 0.4375).abs() < 1e-6);
    }

    #[test]
    fn test_suppress_keeps_strongest() {
        let kept = suppress(vec![
            candidate(0.8, [0.1, 0.1, 0.5, 0.5]),
            candidate(0.95, [0.12, 0.12, 0.52, 0.52]),
            candidate(0.9, [0.6, 0.6, 0.9, 0.9]),
        ]);
        let scores: Vec<f32> = kept.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.95, 0.9]);
    }

    #[test]
    fn test_to_face_scales_to_pixels() {
        let mut c = candidate(0.9, [0.25, 0.1, 0.75, 0.6]);
        c.keypoints[NOSE_KEYPOINT] = [0.5, 0.25];
        let face = to_face(&c, 200, 100);

        assert_eq!(face.bbox, BoundingBox::new(50, 10, 100, 50));
        assert_eq!(face.landmarks.nose_base, Some(Point::new(100.0, 25.0)));
        assert_eq!(face.landmarks.mouth_left, None);
        assert!(!face.landmarks.is_complete());
    }
}
