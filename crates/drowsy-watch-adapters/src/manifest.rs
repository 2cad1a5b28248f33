//! Pose manifests: face boxes and landmarks extracted ahead of time.
//!
//! A manifest is a JSON object mapping image file names to the faces found
//! in that image:
//!
//! ```json
//! {
//!   "frames": {
//!     "frame_0000.png": [
//!       {
//!         "bbox": { "left": 40, "top": 30, "width": 120, "height": 140 },
//!         "landmarks": {
//!           "mouth_left": { "x": 80.0, "y": 140.0 },
//!           "mouth_right": { "x": 120.0, "y": 140.0 },
//!           "mouth_bottom": { "x": 100.0, "y": 150.0 },
//!           "nose_base": { "x": 100.0, "y": 110.0 }
//!         }
//!       }
//!     ]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use drowsy_watch_core::{DetectedFace, FaceDetector, ImageInfo};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Faces per image file name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseManifest {
    /// Faces keyed by file name (not full path).
    #[serde(default)]
    pub frames: BTreeMap<String, Vec<DetectedFace>>,
}

impl PoseManifest {
    /// Reads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pose manifest {}", path.display()))?;
        let manifest = Self::from_json(&text)
            .with_context(|| format!("Invalid pose manifest {}", path.display()))?;
        debug!(
            "Loaded poses for {} frames from {}",
            manifest.frames.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid manifest.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse pose manifest")
    }

    /// Records the faces of one image.
    pub fn insert(&mut self, file_name: impl Into<String>, faces: Vec<DetectedFace>) {
        self.frames.insert(file_name.into(), faces);
    }

    /// Returns the faces recorded for `file_name`.
    #[must_use]
    pub fn faces(&self, file_name: &str) -> &[DetectedFace] {
        self.frames.get(file_name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Face detector that looks faces up in a [`PoseManifest`].
///
/// Images are matched by the file name of [`ImageInfo::path`]. Images not in
/// the manifest have no face.
#[derive(Debug, Clone)]
pub struct ManifestDetector {
    manifest: PoseManifest,
}

impl ManifestDetector {
    /// Wraps a manifest.
    #[must_use]
    pub const fn new(manifest: PoseManifest) -> Self {
        Self { manifest }
    }

    /// Loads a manifest file.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        PoseManifest::load(path).map(Self::new)
    }
}

impl FaceDetector for ManifestDetector {
    fn detect(&self, image: &ImageInfo) -> Result<Vec<DetectedFace>> {
        let name = Path::new(&image.path)
            .file_name()
            .map_or_else(|| image.path.clone(), |n| n.to_string_lossy().into_owned());
        let faces = self.manifest.faces(&name);
        trace!("Manifest has {} faces for {name}", faces.len());
        Ok(faces.to_vec())
    }
}
