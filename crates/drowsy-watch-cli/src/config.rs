//! Configuration file support for drowsy-watch.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/drowsy-watch/config.toml` (lowest priority)
//! - Project-local: `.drowsy-watch.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

/// File name of the project-local config.
const PROJECT_FILE: &str = ".drowsy-watch.toml";

/// Slowest accepted replay frame rate, one frame every 1000 seconds.
pub const MIN_FPS: f64 = 0.001;

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Alert state machine thresholds.
    pub thresholds: ThresholdsConfig,
    /// Rate limiter settings.
    pub limiter: LimiterConfig,
    /// Frame replay settings.
    pub replay: ReplayConfig,
    /// Model settings.
    pub models: ModelsConfig,
    /// Output formatting settings.
    pub output: OutputConfig,
}

/// Threshold overrides. Unset values keep the built-in defaults.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    /// Openness below which eyes count as deeply closed (0.0-1.0).
    pub critical_openness: Option<f64>,
    /// Openness below which eyes count as partially closed (0.0-1.0).
    pub low_openness: Option<f64>,
    /// Mouth ratio above which a frame counts as a yawn.
    pub yawn_ratio: Option<f64>,
    /// Consecutive frames needed for a LOW alert.
    pub low_frames: Option<u32>,
    /// Consecutive frames needed for a CRITICAL alert.
    pub critical_frames: Option<u32>,
    /// Margin over `low_openness` that counts as clearly awake.
    pub awake_margin: Option<f64>,
    /// Mouth ratio that must not be reached to count as awake.
    pub awake_mouth_ceiling: Option<f64>,
}

/// Rate limiter configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Minimum milliseconds between analyzed frames.
    pub min_interval_ms: Option<u64>,
}

/// Frame replay configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Frames per second assumed when replaying image files.
    pub fps: Option<f64>,
    /// Recurse into subdirectories by default.
    pub recursive: Option<bool>,
}

/// Model configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Custom models directory path.
    pub dir: Option<PathBuf>,
    /// Prefer a GPU device when one is compiled in.
    pub gpu: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json" or "jsonl".
    pub format: Option<String>,
    /// Pretty-print JSON output.
    pub pretty: Option<bool>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Missing files are silently ignored. Invalid values are reported as
    /// warnings and dropped, so the built-in default applies.
    pub fn load() -> Self {
        let cwd = std::env::current_dir().ok();
        Self::load_from(xdg_config_path().as_deref(), cwd.as_deref())
    }

    /// Loads the XDG file at `xdg_path`, then the project file found from `cwd`.
    pub fn load_from(xdg_path: Option<&Path>, cwd: Option<&Path>) -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_path {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = cwd.and_then(find_config_in_parents) {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        for problem in config.sanitize() {
            warn!("Ignoring config value: {problem}");
        }

        config
    }

    /// Drops out-of-range values and returns a description of each.
    fn sanitize(&mut self) -> Vec<String> {
        let mut problems = Vec::new();
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        let non_negative = |v: f64| v >= 0.0 && v.is_finite();

        let t = &mut self.thresholds;
        let p = &mut problems;
        check(&mut t.critical_openness, "thresholds.critical_openness", "0.0-1.0", unit, p);
        check(&mut t.low_openness, "thresholds.low_openness", "0.0-1.0", unit, p);
        check(&mut t.yawn_ratio, "thresholds.yawn_ratio", ">= 0.0", non_negative, p);
        check(&mut t.awake_margin, "thresholds.awake_margin", ">= 0.0", non_negative, p);
        let ceiling = &mut t.awake_mouth_ceiling;
        check(ceiling, "thresholds.awake_mouth_ceiling", ">= 0.0", non_negative, p);
        check(&mut t.low_frames, "thresholds.low_frames", ">= 1", |v| v >= 1, p);
        check(&mut t.critical_frames, "thresholds.critical_frames", ">= 1", |v| v >= 1, p);
        let fps_ok = |v: f64| v >= MIN_FPS && v.is_finite();
        check(&mut self.replay.fps, "replay.fps", ">= 0.001", fps_ok, p);

        if let Some(f) = self.output.format.take() {
            if f == "json" || f == "jsonl" {
                self.output.format = Some(f);
            } else {
                problems.push(format!(
                    "output.format must be 'json' or 'jsonl', got '{f}'"
                ));
            }
        }

        problems
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        let (t, o) = (&mut self.thresholds, other.thresholds);
        t.critical_openness = o.critical_openness.or(t.critical_openness);
        t.low_openness = o.low_openness.or(t.low_openness);
        t.yawn_ratio = o.yawn_ratio.or(t.yawn_ratio);
        t.low_frames = o.low_frames.or(t.low_frames);
        t.critical_frames = o.critical_frames.or(t.critical_frames);
        t.awake_margin = o.awake_margin.or(t.awake_margin);
        t.awake_mouth_ceiling = o.awake_mouth_ceiling.or(t.awake_mouth_ceiling);

        self.limiter.min_interval_ms = other
            .limiter
            .min_interval_ms
            .or(self.limiter.min_interval_ms);

        self.replay.fps = other.replay.fps.or(self.replay.fps);
        self.replay.recursive = other.replay.recursive.or(self.replay.recursive);

        self.models.dir = other.models.dir.or_else(|| self.models.dir.take());
        self.models.gpu = other.models.gpu.or(self.models.gpu);

        self.output.format = other.output.format.or_else(|| self.output.format.take());
        self.output.pretty = other.output.pretty.or(self.output.pretty);
        self.output.progress = other.output.progress.or(self.output.progress);
    }
}

/// Clears `slot` if its value fails `valid`.
fn check<T: Copy + std::fmt::Display>(
    slot: &mut Option<T>,
    name: &str,
    expected: &str,
    valid: impl Fn(T) -> bool,
    problems: &mut Vec<String>,
) {
    if let Some(value) = *slot {
        if !valid(value) {
            problems.push(format!("{name} must be {expected}, got {value}"));
            *slot = None;
        }
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("drowsy-watch").join("config.toml"))
}

/// Search for the project config in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE))
        .find(|path| path.exists())
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}
