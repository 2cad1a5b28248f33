//! Analyze command - one-shot eye openness for still images.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use drowsy_watch_adapters::FsImageSource;
use drowsy_watch_core::{analyze_still, ImageSource, OpennessEstimator, ReportOutput, StillVerdict};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::engine::EngineArgs;
use crate::output::JsonOutput;

/// Arguments for the analyze command.
#[derive(Args, Clone)]
pub struct AnalyzeArgs {
    /// Image files or directories
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl AnalyzeArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if !self.recursive {
            self.recursive = config.replay.recursive.unwrap_or(false);
        }
        self.engine = self.engine.with_config(config);
        self
    }
}

/// Run the analyze command, printing one verdict per readable image.
pub fn run(args: &AnalyzeArgs) -> Result<Vec<StillVerdict>> {
    info!("Running analyze command on {} paths", args.images.len());

    let engine = args.engine.load()?;
    let estimator = OpennessEstimator::new(engine.model);
    let source = FsImageSource::new(args.images.clone(), args.recursive);
    let output = JsonOutput::stdout();

    let mut verdicts = Vec::new();
    for image in source.images() {
        let info = match image {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping image: {e:#}");
                continue;
            }
        };
        let openness = analyze_still(engine.detector.as_ref(), &estimator, &info);
        let verdict = StillVerdict::from_openness(info.path, openness);
        output.write_line(&verdict)?;
        verdicts.push(verdict);
    }
    output.flush()?;

    Ok(verdicts)
}
