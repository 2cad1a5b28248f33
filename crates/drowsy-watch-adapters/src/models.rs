//! Model artifact location.
//!
//! Artifacts are installed by hand into a models directory; nothing is
//! downloaded.

use std::path::{Path, PathBuf};

use tracing::debug;

/// A model file the CLI knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelArtifact {
    /// Short name.
    pub name: &'static str,
    /// File name inside the models directory.
    pub filename: &'static str,
    /// What the file is for.
    pub description: &'static str,
    /// Whether monitoring cannot start without it.
    pub required: bool,
}

/// Eye-openness classifier weights.
pub const EYE_OPENNESS: ModelArtifact = ModelArtifact {
    name: "eye_openness",
    filename: "eye_openness.safetensors",
    description: "eye-openness classifier weights",
    required: true,
};

/// Label list matching the classifier outputs.
pub const LABELS: ModelArtifact = ModelArtifact {
    name: "labels",
    filename: "labels.txt",
    description: "eye-openness label list",
    required: true,
};

/// Face detector weights. Not needed when poses come from a manifest.
pub const BLAZEFACE: ModelArtifact = ModelArtifact {
    name: "blazeface",
    filename: "blazeface.safetensors",
    description: "BlazeFace face detector weights",
    required: false,
};

/// Known model artifacts.
pub const ARTIFACTS: &[ModelArtifact] = &[EYE_OPENNESS, LABELS, BLAZEFACE];

/// A directory holding model artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Uses `dir` as the models directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Uses `XDG_DATA_HOME/drowsy-watch/models` or `~/.local/share/drowsy-watch/models`.
    #[must_use]
    pub fn default_location() -> Self {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drowsy-watch")
            .join("models");
        debug!("Default models directory: {}", dir.display());
        Self::new(dir)
    }

    /// Returns the models directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns where `artifact` lives in this store.
    #[must_use]
    pub fn artifact_path(&self, artifact: &ModelArtifact) -> PathBuf {
        self.dir.join(artifact.filename)
    }

    /// Returns the path of a known artifact by name.
    #[must_use]
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        ARTIFACTS
            .iter()
            .find(|a| a.name == name)
            .map(|a| self.artifact_path(a))
    }

    /// Lists every artifact with whether it is installed.
    #[must_use]
    pub fn list(&self) -> Vec<(ModelArtifact, bool)> {
        ARTIFACTS
            .iter()
            .map(|a| (*a, self.artifact_path(a).is_file()))
            .collect()
    }

    /// Checks if every required artifact is installed.
    #[must_use]
    pub fn required_installed(&self) -> bool {
        self.list()
            .iter()
            .all(|(artifact, installed)| *installed || !artifact.required)
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::default_location()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_location() {
        let store = ModelStore::default_location();
        assert!(store.dir().ends_with("drowsy-watch/models"));
    }

    #[test]
    fn test_artifact_paths() {
        let store = ModelStore::new("/opt/models");
        assert_eq!(
            store.path("eye_openness"),
            Some(PathBuf::from("/opt/models/eye_openness.safetensors"))
        );
        assert_eq!(
            store.path("labels"),
            Some(PathBuf::from("/opt/models/labels.txt"))
        );
        assert!(store.path("unknown").is_none());
        assert_eq!(
            store.artifact_path(&BLAZEFACE),
            PathBuf::from("/opt/models/blazeface.safetensors")
        );
    }

    #[test]
    fn test_list_reports_installed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        assert!(!store.required_installed());

        std::fs::write(dir.path().join("eye_openness.safetensors"), b"x").unwrap();
        std::fs::write(dir.path().join("labels.txt"), b"Open_Eyes\n").unwrap();

        let installed: Vec<_> = store
            .list()
            .into_iter()
            .map(|(a, ok)| (a.name, ok))
            .collect();
        assert_eq!(
            installed,
            vec![("eye_openness", true), ("labels", true), ("blazeface", false)]
        );
        assert!(store.required_installed());
    }
}
