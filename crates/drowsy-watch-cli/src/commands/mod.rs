//! CLI command definitions and handlers.

pub mod analyze;
pub mod models;
pub mod monitor;

use clap::{Parser, Subcommand};

/// Drowsy Watch - camera-based drowsiness detection
#[derive(Parser)]
#[command(name = "drowsy-watch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Replay image frames as a camera feed and track the alert level
    Monitor(monitor::MonitorArgs),
    /// Estimate eye openness for still images
    Analyze(analyze::AnalyzeArgs),
    /// Inspect installed model artifacts
    Models(models::ModelsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Finished and no alert was raised.
    Success = 0,
    /// Finished and a LOW or CRITICAL alert was raised.
    AlertRaised = 1,
    /// Failed, including missing model artifacts.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}
