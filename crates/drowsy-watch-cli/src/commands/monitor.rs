//! Monitor command - replay frames through the drowsiness pipeline.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use drowsy_watch_adapters::FsImageSource;
use drowsy_watch_core::{
    DetectionState, DrowsinessMonitor, Frame, FrameReport, ImageSource, MonitorConfig,
    MonitorEvent, MonitorWorker, ProgressSink, ReportOutput, SessionSummary, Thresholds,
};
use tracing::{debug, info, warn};

use super::ExitCode;
use crate::config::{AppConfig, MIN_FPS};
use crate::engine::EngineArgs;
use crate::output::{JsonOutput, ProgressBar};

/// Output format for frame reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON Lines (one JSON object per frame)
    #[default]
    Jsonl,
    /// Single JSON array
    Json,
}

/// Hardcoded defaults not covered by [`MonitorConfig::default`].
mod defaults {
    pub const FPS: f64 = 10.0;
}

/// Parse a probability threshold (0.0-1.0).
fn parse_unit(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not in 0.0..=1.0"))
    }
}

/// Parse a non-negative ratio.
fn parse_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{value} must be a finite number >= 0"))
    }
}

/// Parse a frame rate.
fn parse_fps(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value >= MIN_FPS && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{value} must be a finite number >= {MIN_FPS}"))
    }
}

/// Threshold overrides for the alert state machine.
#[derive(Args, Clone, Debug, Default)]
pub struct ThresholdArgs {
    /// Openness below which eyes count as deeply closed (0.0-1.0)
    #[arg(long, value_parser = parse_unit)]
    pub critical_openness: Option<f64>,

    /// Openness below which eyes count as partially closed (0.0-1.0)
    #[arg(long, value_parser = parse_unit)]
    pub low_openness: Option<f64>,

    /// Mouth ratio above which a frame counts as a yawn
    #[arg(long, value_parser = parse_ratio)]
    pub yawn_ratio: Option<f64>,

    /// Consecutive drowsy frames before a LOW alert
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub low_frames: Option<u32>,

    /// Consecutive closed-eye frames before a CRITICAL alert
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub critical_frames: Option<u32>,

    #[arg(skip)]
    awake_margin: Option<f64>,

    #[arg(skip)]
    awake_mouth_ceiling: Option<f64>,
}

impl ThresholdArgs {
    fn with_config(mut self, config: &AppConfig) -> Self {
        let c = &config.thresholds;
        self.critical_openness = self.critical_openness.or(c.critical_openness);
        self.low_openness = self.low_openness.or(c.low_openness);
        self.yawn_ratio = self.yawn_ratio.or(c.yawn_ratio);
        self.low_frames = self.low_frames.or(c.low_frames);
        self.critical_frames = self.critical_frames.or(c.critical_frames);
        self.awake_margin = self.awake_margin.or(c.awake_margin);
        self.awake_mouth_ceiling = self.awake_mouth_ceiling.or(c.awake_mouth_ceiling);
        self
    }

    /// Resolves the overrides against the defaults and validates the result.
    pub fn resolve(&self) -> Result<Thresholds> {
        let d = Thresholds::default();
        let thresholds = Thresholds {
            critical_openness: self.critical_openness.unwrap_or(d.critical_openness),
            low_openness: self.low_openness.unwrap_or(d.low_openness),
            yawn_ratio: self.yawn_ratio.unwrap_or(d.yawn_ratio),
            low_frames: self.low_frames.unwrap_or(d.low_frames),
            critical_frames: self.critical_frames.unwrap_or(d.critical_frames),
            awake_margin: self.awake_margin.unwrap_or(d.awake_margin),
            awake_mouth_ceiling: self.awake_mouth_ceiling.unwrap_or(d.awake_mouth_ceiling),
        };
        thresholds.validate().context("Invalid thresholds")?;
        Ok(thresholds)
    }
}

/// Arguments for the monitor command.
#[derive(Args, Clone)]
pub struct MonitorArgs {
    /// Frame files or directories, replayed in order
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Frame rate used to timestamp replayed frames
    #[arg(long, value_parser = parse_fps)]
    pub fps: Option<f64>,

    /// Minimum milliseconds between analyzed frames
    #[arg(long, value_name = "MS")]
    pub min_interval_ms: Option<u64>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pretty-print JSON output (only affects --format json)
    #[arg(long)]
    pub pretty: bool,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl MonitorArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if !self.recursive {
            self.recursive = config.replay.recursive.unwrap_or(false);
        }
        self.fps = self.fps.or(config.replay.fps);
        self.min_interval_ms = self.min_interval_ms.or(config.limiter.min_interval_ms);
        self.thresholds = self.thresholds.with_config(config);
        self.engine = self.engine.with_config(config);

        if self.format.is_none() {
            self.format = config
                .output
                .format
                .as_deref()
                .and_then(|s| OutputFormat::from_str(s, true).ok());
        }
        if !self.pretty {
            self.pretty = config.output.pretty.unwrap_or(false);
        }
        if !self.progress {
            self.progress = config.output.progress.unwrap_or(false);
        }
        self
    }

    /// Builds the monitor configuration from defaults and overrides.
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let base = MonitorConfig::default();
        Ok(MonitorConfig {
            thresholds: self.thresholds.resolve()?,
            min_interval: self
                .min_interval_ms
                .map_or(base.min_interval, Duration::from_millis),
        })
    }

    fn fps(&self) -> f64 {
        self.fps.unwrap_or(defaults::FPS)
    }

    fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Result of running the monitor command.
pub struct MonitorResult {
    /// Session totals.
    pub summary: SessionSummary,
    /// Exit code.
    pub exit_code: ExitCode,
}

/// Run the monitor command.
///
/// Expects `args` to have been processed through `with_config()` first.
pub fn run(args: &MonitorArgs) -> Result<MonitorResult> {
    info!("Running monitor command on {} paths", args.paths.len());

    let config = args.monitor_config()?;
    let engine = args.engine.load()?;
    let monitor = DrowsinessMonitor::new(engine.detector, engine.model, config);
    let worker = MonitorWorker::spawn(monitor)?;

    let source = FsImageSource::new(args.paths.clone(), args.recursive);
    let show_progress = !args.quiet && (args.progress || std::io::stderr().is_terminal());
    let progress = ProgressBar::new(args.quiet, show_progress);
    let output = match args.format() {
        OutputFormat::Jsonl => JsonOutput::stdout(),
        OutputFormat::Json => JsonOutput::stdout().as_array(args.pretty),
    };

    let summary = replay(&source, &worker, &output, &progress, args.fps())?;

    let final_state = worker.shutdown()?;
    debug!("Monitor stopped in state {final_state:?}");

    let exit_code = if summary.peak_level.is_raised() {
        ExitCode::AlertRaised
    } else {
        ExitCode::Success
    };
    Ok(MonitorResult { summary, exit_code })
}

/// Feeds every frame of `source` to the worker, one at a time.
///
/// Frames are stamped as if captured at `fps` frames per second.
fn replay(
    source: &dyn ImageSource,
    worker: &MonitorWorker,
    output: &dyn ReportOutput,
    progress: &dyn ProgressSink,
    fps: f64,
) -> Result<SessionSummary> {
    progress.on_event(MonitorEvent::Started {
        total: source.count_hint(),
    });

    let start = Instant::now();
    let mut state = DetectionState::default();
    let mut summary = SessionSummary::default();

    for (index, image) in source.images().enumerate() {
        let info = match image {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping frame {index}: {e:#}");
                continue;
            }
        };
        let path = info.path.clone();
        let timestamp = frame_timestamp(start, fps, index)?;

        let outcome = worker
            .submit(Frame::new(info, timestamp))
            .blocking_recv()
            .context("Monitor worker stopped")?;

        if let Some(transition) = outcome.transition() {
            state = transition.current;
            if transition.level_changed() {
                progress.on_event(MonitorEvent::AlertChanged {
                    index,
                    from: transition.previous.alert_level,
                    to: transition.current.alert_level,
                });
            }
        }

        let mut report = FrameReport::new(index, path, outcome.kind(), outcome.signal(), state)
            .with_timestamp(iso_timestamp());
        if let Some(reason) = outcome.error() {
            report = report.with_error(reason);
        }
        summary.record(&report);
        output.write(&report)?;
        progress.on_event(MonitorEvent::Frame { report });
    }

    output.flush()?;

    progress.on_event(MonitorEvent::Finished { summary });
    Ok(summary)
}

/// Generate ISO 8601 UTC timestamp (RFC 3339 format).
fn iso_timestamp() -> String {
    match time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339) {
        Ok(ts) => ts,
        Err(e) => {
            debug!("Timestamp format failed: {e}");
            String::from("1970-01-01T00:00:00Z")
        }
    }
}

/// Capture time of the `index`-th frame at `fps` frames per second.
///
/// Fails if the offset does not fit in a [`Duration`] or overflows `start`.
#[allow(clippy::cast_precision_loss)]
fn frame_timestamp(start: Instant, fps: f64, index: usize) -> Result<Instant> {
    let offset = Duration::try_from_secs_f64(index as f64 / fps)
        .with_context(|| format!("Frame {index} at {fps} fps has no valid timestamp"))?;
    start
        .checked_add(offset)
        .with_context(|| format!("Frame {index} at {fps} fps is too far in the future"))
}
