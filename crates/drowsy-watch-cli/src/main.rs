//! Drowsy Watch CLI - camera-based drowsiness detection.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod engine;
mod output;

use commands::{Cli, Commands, ExitCode};
use config::AppConfig;

/// Maps `-v` occurrences to a log filter, honouring `RUST_LOG` when set.
fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn exit_with<T>(result: anyhow::Result<T>, on_success: impl FnOnce(T) -> ExitCode) -> ExitCode {
    result.map_or_else(
        |e| {
            eprintln!("error: {e:#}");
            ExitCode::Error
        },
        on_success,
    )
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(cli.verbose))
        .init();

    let config = AppConfig::load();

    let exit_code = match cli.command {
        Commands::Monitor(args) => {
            exit_with(commands::monitor::run(&args.with_config(&config)), |result| {
                info!(
                    "Session finished: {} frames, peak alert {}",
                    result.summary.submitted, result.summary.peak_level
                );
                result.exit_code
            })
        }
        Commands::Analyze(args) => {
            exit_with(commands::analyze::run(&args.with_config(&config)), |verdicts| {
                info!("Analyzed {} images", verdicts.len());
                ExitCode::Success
            })
        }
        Commands::Models(args) => {
            exit_with(commands::models::run(&args.with_config(&config)), |()| ExitCode::Success)
        }
    };

    exit_code.into()
}
