//! Eye-openness classifier.
//!
//! A four-stage CNN over a normalized 160x160 RGB face crop. Each stage is a
//! 3x3 convolution, ReLU and 2x2 max pool, taking the map from 160 down to
//! 10. Two fully connected layers map the flattened features to one logit
//! per label. Label 0 is "eyes open".

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]

use std::path::Path;

use anyhow::{ensure, Context, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, VarBuilder};
use tracing::{debug, info};

use super::{load_labels, load_safetensors, sigmoid, softmax};
use crate::analysis::DEFAULT_INPUT_SIZE;
use crate::error::InitError;
use crate::ports::{ImageClassifier, ImageTensor};

/// Output channels of the four convolution stages.
const CONV_CHANNELS: [usize; 4] = [16, 32, 64, 64];

/// Width of the hidden fully connected layer.
const HIDDEN_UNITS: usize = 128;

/// The network alone, without labels.
pub struct EyeOpennessNet {
    convs: Vec<Conv2d>,
    fc1: Linear,
    fc2: Linear,
}

impl EyeOpennessNet {
    /// Builds the network from weights for `num_labels` outputs.
    ///
    /// Expects tensors `conv1`..`conv4`, `fc1` and `fc2` (weight and bias).
    ///
    /// # Errors
    ///
    /// Returns an error if a tensor is missing or has the wrong shape.
    pub fn new(vb: &VarBuilder, num_labels: usize) -> Result<Self> {
        let config = Conv2dConfig {
            padding: 1,
            ..Conv2dConfig::default()
        };

        let mut convs = Vec::with_capacity(CONV_CHANNELS.len());
        let mut in_channels = 3;
        for (i, &out_channels) in CONV_CHANNELS.iter().enumerate() {
            let conv = conv2d(in_channels, out_channels, 3, config, vb.pp(format!("conv{}", i + 1)))
                .with_context(|| format!("Failed to load conv{}", i + 1))?;
            convs.push(conv);
            in_channels = out_channels;
        }

        let side = DEFAULT_INPUT_SIZE as usize >> CONV_CHANNELS.len();
        let flat = in_channels * side * side;
        let fc1 = linear(flat, HIDDEN_UNITS, vb.pp("fc1")).context("Failed to load fc1")?;
        let fc2 = linear(HIDDEN_UNITS, num_labels, vb.pp("fc2")).context("Failed to load fc2")?;

        Ok(Self { convs, fc1, fc2 })
    }
}

impl Module for EyeOpennessNet {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let mut h = x.clone();
        for conv in &self.convs {
            h = conv.forward(&h)?.relu()?.max_pool2d(2)?;
        }
        let h = h.flatten_from(1)?;
        let h = self.fc1.forward(&h)?.relu()?;
        self.fc2.forward(&h)
    }
}

/// Eye-openness network plus its label list, usable as an [`ImageClassifier`].
pub struct EyeOpennessModel {
    net: EyeOpennessNet,
    labels: Vec<String>,
    device: Device,
}

impl EyeOpennessModel {
    /// Loads weights and labels.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::MissingArtifact`] if either file is missing,
    /// [`InitError::EmptyLabels`] if the label list is empty and
    /// [`InitError::Model`] if the weights do not fit the network (including
    /// an output width that differs from the label count).
    pub fn load(
        model_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
        device: &Device,
    ) -> Result<Self, InitError> {
        let model_path = model_path.as_ref();
        if !model_path.is_file() {
            return Err(InitError::MissingArtifact(model_path.to_path_buf()));
        }
        let labels = load_labels(labels_path)?;

        let net = load_safetensors(model_path, device)
            .and_then(|vb| EyeOpennessNet::new(&vb, labels.len()))
            .map_err(|reason| InitError::Model {
                path: model_path.to_path_buf(),
                reason,
            })?;

        info!(
            "Loaded eye-openness model {} ({} labels)",
            model_path.display(),
            labels.len()
        );
        Ok(Self {
            net,
            labels,
            device: device.clone(),
        })
    }

    /// Returns the labels in output order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn to_tensor(&self, input: &ImageTensor) -> Result<Tensor> {
        let (w, h, c) = (
            input.width as usize,
            input.height as usize,
            input.channels as usize,
        );
        let expected = DEFAULT_INPUT_SIZE as usize;
        ensure!(
            w == expected && h == expected && c == 3,
            "Expected a {expected}x{expected}x3 input, got {w}x{h}x{c}"
        );
        ensure!(
            input.data.len() == w * h * c,
            "Input holds {} values, expected {}",
            input.data.len(),
            w * h * c
        );

        Tensor::from_slice(&input.data, (1, h, w, c), &self.device)?
            .permute((0, 3, 1, 2))?
            .contiguous()
            .context("Failed to build input tensor")
    }
}

impl ImageClassifier for EyeOpennessModel {
    fn input_size(&self) -> u32 {
        DEFAULT_INPUT_SIZE
    }

    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        let x = self.to_tensor(input)?;
        let logits = self
            .net
            .forward(&x)
            .context("Eye-openness inference failed")?
            .squeeze(0)?
            .to_vec1::<f32>()?;
        debug!("Eye-openness logits: {logits:?}");

        Ok(if logits.len() == 1 {
            vec![sigmoid(logits[0])]
        } else {
            softmax(&logits)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flattened_size() {
        let side = DEFAULT_INPUT_SIZE as usize >> CONV_CHANNELS.len();
        assert_eq!(side, 10);
        assert_eq!(CONV_CHANNELS[3] * side * side, 6400);
    }

    #[test]
    fn test_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        std::fs::write(&labels, "Open_Eyes\nClosed_Eyes\n").unwrap();

        let err = EyeOpennessModel::load(dir.path().join("none.safetensors"), &labels, &Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, InitError::MissingArtifact(_)));
    }

    #[test]
    fn test_missing_labels() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.safetensors");
        std::fs::write(&model, b"").unwrap();

        let err = EyeOpennessModel::load(&model, dir.path().join("labels.txt"), &Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, InitError::MissingArtifact(p) if p.ends_with("labels.txt")));
    }

    #[test]
    fn test_corrupt_weights() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.safetensors");
        let labels = dir.path().join("labels.txt");
        std::fs::write(&model, b"garbage").unwrap();
        std::fs::write(&labels, "Open_Eyes\n").unwrap();

        let err = EyeOpennessModel::load(&model, &labels, &Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, InitError::Model { .. }));
    }
}
