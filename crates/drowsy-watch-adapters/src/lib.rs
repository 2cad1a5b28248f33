//! Drowsy Watch Adapters - external adapters for drowsy-watch.
//!
//! This crate provides adapters for:
//! - Filesystem frame sources (replaying image files as a camera feed)
//! - Pose manifests (pre-extracted face boxes and landmarks)
//! - Model artifact location

pub mod fs;
pub mod manifest;
pub mod models;

pub use fs::{load_image, FsImageSource};
pub use manifest::{ManifestDetector, PoseManifest};
pub use models::{ModelArtifact, ModelStore, ARTIFACTS, BLAZEFACE, EYE_OPENNESS, LABELS};
