//! Writers for small eye-openness model artifacts.
//!
//! The weights are all zero except the output bias, so every input yields
//! the same logits and the model's openness is fixed by the bias alone.

use std::path::Path;

use anyhow::Context;
use safetensors::tensor::TensorView;
use safetensors::Dtype;

/// `(name, shape)` of every eye-openness tensor except `fc2`.
const HIDDEN_TENSORS: [(&str, &[usize]); 10] = [
    ("conv1.weight", &[16, 3, 3, 3]),
    ("conv1.bias", &[16]),
    ("conv2.weight", &[32, 16, 3, 3]),
    ("conv2.bias", &[32]),
    ("conv3.weight", &[64, 32, 3, 3]),
    ("conv3.bias", &[64]),
    ("conv4.weight", &[64, 64, 3, 3]),
    ("conv4.bias", &[64]),
    ("fc1.weight", &[128, 6400]),
    ("fc1.bias", &[128]),
];

/// Returns a two-label output bias whose softmax puts `openness` in slot 0.
#[must_use]
pub fn openness_bias(openness: f32) -> Vec<f32> {
    let p = openness.clamp(1e-4, 1.0 - 1e-4);
    vec![(p / (1.0 - p)).ln(), 0.0]
}

/// Writes an eye-openness safetensors file with one output per bias value.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_openness_weights(path: &Path, fc2_bias: &[f32]) -> anyhow::Result<()> {
    let labels = fc2_bias.len();
    let mut buffers: Vec<(String, Vec<usize>, Vec<f32>)> = HIDDEN_TENSORS
        .iter()
        .map(|&(name, shape)| {
            (
                name.to_string(),
                shape.to_vec(),
                vec![0.0; shape.iter().product()],
            )
        })
        .collect();
    buffers.push(("fc2.weight".into(), vec![labels, 128], vec![0.0; labels * 128]));
    buffers.push(("fc2.bias".into(), vec![labels], fc2_bias.to_vec()));

    let views = buffers
        .iter()
        .map(|(name, shape, data)| {
            TensorView::new(Dtype::F32, shape.clone(), bytemuck::cast_slice(data))
                .map(|view| (name.as_str(), view))
                .with_context(|| format!("Invalid tensor {name}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    safetensors::serialize_to_file(views, &None, path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Writes a label list, one label per line.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_labels(path: &Path, labels: &[&str]) -> anyhow::Result<()> {
    let mut text = labels.join("\n");
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

/// Writes `eye_openness.safetensors` and `labels.txt` into `dir` for a model
/// that always reports `openness`.
///
/// # Errors
///
/// Returns an error if a file cannot be written.
pub fn write_model_dir(dir: &Path, openness: f32) -> anyhow::Result<()> {
    write_openness_weights(&dir.join("eye_openness.safetensors"), &openness_bias(openness))?;
    write_labels(&dir.join("labels.txt"), &["Open_Eyes", "Closed_Eyes"])
}
