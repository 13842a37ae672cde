//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::inputs::Inputs;
use super::output::{Output, OutputFormat};
use super::{batch_cmd, cache_cmd, layout_cmd};
use crate::storage::{Config, PlannerConfig, RecordStore, CONFIG_FILE};

#[derive(Parser)]
#[command(name = "calplan")]
#[command(author, version, about = "Calendar task-bar layout engine")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the user config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Planner config file (defaults to the nearest planner.toml)
    #[arg(long, short = 'c', global = true, env = "CALPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter planner.toml and empty task file
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing planner.toml
        #[arg(long)]
        force: bool,
    },

    /// Validate task records
    Check {
        /// Task records file (defaults to `tasks` in planner.toml)
        #[arg(long, short = 't')]
        tasks: Option<PathBuf>,

        /// Fail if any record is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Lay out one view and print its bars
    Layout {
        /// Task records file (defaults to `tasks` in planner.toml)
        #[arg(long, short = 't')]
        tasks: Option<PathBuf>,

        /// View name (defaults to the first configured view)
        #[arg(long)]
        view: Option<String>,

        /// Print overlap and efficiency statistics
        #[arg(long)]
        stats: bool,
    },

    /// Lay out several views in parallel
    Batch {
        /// Task records file (defaults to `tasks` in planner.toml)
        #[arg(long, short = 't')]
        tasks: Option<PathBuf>,

        /// Views to render (repeatable; defaults to all)
        #[arg(long = "view")]
        views: Vec<String>,

        /// Worker threads (0 = available parallelism)
        #[arg(long, short = 'j')]
        workers: Option<usize>,
    },

    /// Inspect the layout cache
    #[command(subcommand)]
    Cache(cache_cmd::CacheCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let format = cli
        .format
        .unwrap_or_else(|| config.global.default_format.into());
    let output = Output::new(format, cli.verbose);

    output.verbose("calplan starting");
    if let Some(path) = &config.path {
        output.verbose(&format!("Using config {}", path.display()));
    }

    match cli.command {
        Commands::Init { path, force } => {
            output.verbose_ctx("init", &format!("Initializing planner at: {}", path.display()));
            init(&output, &path, force)?
        }

        Commands::Check { tasks, strict } => {
            let inputs = Inputs::load(config, tasks.as_deref(), &output)?;
            layout_cmd::check(&output, &inputs, strict)?
        }

        Commands::Layout { tasks, view, stats } => {
            let inputs = Inputs::load(config, tasks.as_deref(), &output)?;
            layout_cmd::layout(&output, &inputs, view.as_deref(), stats)?
        }

        Commands::Batch { tasks, views, workers } => {
            let inputs = Inputs::load(config, tasks.as_deref(), &output)?;
            batch_cmd::run(&output, &inputs, &views, workers)?
        }

        Commands::Cache(cmd) => cache_cmd::run(cmd, config, &output)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

/// Writes `planner.toml` and an empty `tasks.jsonl`
fn init(output: &Output, path: &Path, force: bool) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    let config_path = path.join(CONFIG_FILE);
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    let starter = PlannerConfig::starter();
    std::fs::write(&config_path, starter.to_toml()?)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
    output.verbose_ctx("init", &format!("Wrote {}", config_path.display()));

    if let Some(tasks) = &starter.tasks {
        let store = RecordStore::new(path.join(tasks));
        if !store.path().exists() {
            store.write_all(&[])?;
            output.verbose_ctx("init", &format!("Created {}", store.path().display()));
        }
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "initialized": true,
            "config": config_path.display().to_string(),
        }));
    } else {
        output.success(&format!("Initialized planner at {}", config_path.display()));
    }
    Ok(())
}
