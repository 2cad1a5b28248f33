//! Model loading shared by the `monitor` and `analyze` commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use drowsy_watch_adapters::{ManifestDetector, ModelStore, BLAZEFACE, EYE_OPENNESS, LABELS};
use drowsy_watch_core::inference::{load_safetensors, select_device, BlazeFace, EyeOpennessModel};
use drowsy_watch_core::{FaceDetector, InitError};
use tracing::{debug, info};

use crate::config::AppConfig;

/// Where the detector and classifier come from.
#[derive(Args, Clone, Debug, Default)]
pub struct EngineArgs {
    /// Pose manifest (JSON) used instead of the BlazeFace detector
    #[arg(long, value_name = "FILE")]
    pub poses: Option<PathBuf>,

    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR")]
    pub models_dir: Option<PathBuf>,

    /// Run inference on a GPU when built with `metal` or `cuda`
    #[arg(long)]
    pub gpu: bool,
}

/// A loaded detector and classifier pair.
pub struct Engine {
    /// Face detector (BlazeFace or a pose manifest).
    pub detector: Box<dyn FaceDetector>,
    /// Eye-openness classifier.
    pub model: EyeOpennessModel,
}

impl EngineArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }
        if !self.gpu {
            self.gpu = config.models.gpu.unwrap_or(false);
        }
        self
    }

    /// Returns the model store selected by `--models-dir` or the default location.
    pub fn store(&self) -> ModelStore {
        self.models_dir
            .as_ref()
            .map_or_else(ModelStore::default_location, |dir| ModelStore::new(dir.clone()))
    }

    /// Loads every artifact needed to run the pipeline.
    ///
    /// Fails with [`InitError`] if an artifact is missing or unusable.
    pub fn load(&self) -> Result<Engine> {
        let store = self.store();
        debug!("Using models directory: {}", store.dir().display());
        let device = select_device(self.gpu);

        let model = EyeOpennessModel::load(
            store.artifact_path(&EYE_OPENNESS),
            store.artifact_path(&LABELS),
            &device,
        )?;

        let detector: Box<dyn FaceDetector> = if let Some(poses) = &self.poses {
            info!("Reading face poses from {}", poses.display());
            Box::new(
                ManifestDetector::from_file(poses)
                    .with_context(|| format!("Failed to load pose manifest {}", poses.display()))?,
            )
        } else {
            let path = store.artifact_path(&BLAZEFACE);
            if !path.is_file() {
                return Err(InitError::MissingArtifact(path).into());
            }
            let detector = load_safetensors(&path, &device)
                .and_then(|vb| BlazeFace::new(&vb))
                .map_err(|reason| InitError::Model { path, reason })?;
            Box::new(detector)
        };

        Ok(Engine { detector, model })
    }
}
