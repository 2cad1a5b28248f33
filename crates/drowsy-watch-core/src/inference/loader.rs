//! Loading of model weights and label lists.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

use crate::error::InitError;

/// Reads a safetensors file into a `VarBuilder` on `device`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid safetensors or
/// holds a tensor of an unsupported dtype.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;
    let file = SafeTensors::deserialize(&bytes)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut tensors = HashMap::new();
    for (name, view) in file.tensors() {
        let dtype = candle_dtype(view.dtype())
            .with_context(|| format!("Tensor '{name}' in {}", path.display()))?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        tensors.insert(name, tensor);
    }
    debug!("Loaded {} tensors", tensors.len());

    Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
}

fn candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    Ok(match dtype {
        S::F32 => DType::F32,
        S::F64 => DType::F64,
        S::F16 => DType::F16,
        S::BF16 => DType::BF16,
        S::I64 => DType::I64,
        S::U32 => DType::U32,
        S::U8 => DType::U8,
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    })
}

/// Reads a label list, one label per line.
///
/// Lines are trimmed and blank lines skipped. A leading `"<index> "` prefix,
/// as written by some training tools, is stripped.
///
/// # Errors
///
/// Returns [`InitError::MissingArtifact`] if the file cannot be read and
/// [`InitError::EmptyLabels`] if it holds no labels.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>, InitError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|_| InitError::MissingArtifact(path.to_path_buf()))?;

    let labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_index(line).to_string())
        .collect();

    if labels.is_empty() {
        return Err(InitError::EmptyLabels(path.to_path_buf()));
    }
    debug!("Loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

fn strip_index(line: &str) -> &str {
    match line.split_once(' ') {
        Some((index, rest)) if index.bytes().all(|b| b.is_ascii_digit()) && !rest.is_empty() => {
            rest.trim_start()
        }
        _ => line,
    }
}
