//! Models command - inspect model artifacts.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use drowsy_watch_adapters::ModelStore;

use crate::config::AppConfig;

/// Arguments for the models command
#[derive(Args, Clone)]
pub struct ModelsArgs {
    /// Custom models directory (overrides default and config)
    #[arg(long, value_name = "DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Models subcommands
#[derive(Subcommand, Clone, Copy)]
pub enum ModelsCommand {
    /// List model artifacts and whether they are installed
    List,
    /// Print model directory path
    Path,
}

impl ModelsArgs {
    /// Apply configuration file values, respecting CLI precedence.
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        if self.models_dir.is_none() {
            self.models_dir.clone_from(&config.models.dir);
        }
        self
    }

    fn store(&self) -> ModelStore {
        self.models_dir
            .as_ref()
            .map_or_else(ModelStore::default_location, |dir| ModelStore::new(dir.clone()))
    }
}

/// Run the models command.
#[allow(clippy::unnecessary_wraps)]
pub fn run(args: &ModelsArgs) -> Result<()> {
    let store = args.store();
    match args.command {
        ModelsCommand::List => list_models(&store),
        ModelsCommand::Path => println!("{}", store.dir().display()),
    }
    Ok(())
}

fn list_models(store: &ModelStore) {
    let models = store.list();

    println!("Models directory: {}", store.dir().display());
    println!();

    for (artifact, installed) in &models {
        let status = if *installed { "✓" } else { "✗" };
        let optional = if artifact.required { "" } else { ", optional" };
        println!(
            "  {status} {} ({}{optional}): {}",
            artifact.name, artifact.filename, artifact.description
        );
    }

    println!();
    let installed_count = models.iter().filter(|(_, installed)| *installed).count();
    println!("{}/{} models installed", installed_count, models.len());
    if !store.required_installed() {
        println!("Copy the missing files into the models directory.");
    }
}
