//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::app::App;
use crate::config::Config;
use crate::error::Result;

/// Glitchwatch - price-glitch detection and notification pipeline.
#[derive(Parser, Debug)]
#[command(name = "glitchwatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline (foreground)
    Run(RunArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),
}

/// Subcommands for `glitchwatch check`
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate configuration file
    Config(ConfigPathArg),
}

/// Shared argument for commands that only need a config path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

/// Dispatch a parsed command.
///
/// # Errors
///
/// Propagates configuration and startup failures to `main`, which exits
/// nonzero.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check(CheckCommand::Config(args)) => check_config(&args),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.format = "json".into();
    }

    config.logging.init();
    info!(config = %args.config.display(), "glitchwatch starting");

    App::run(config).await
}

fn check_config(args: &ConfigPathArg) -> Result<()> {
    let config = Config::load(&args.config)?;

    println!("Configuration OK: {}", args.config.display());
    println!(
        "  streams: {} -> {}",
        config.streams.detected, config.streams.confirmed
    );
    println!(
        "  models: {} ({} standard)",
        config.router.models.len(),
        config
            .router
            .models
            .iter()
            .filter(|m| m.tier == crate::config::ModelTier::Standard)
            .count()
    );
    println!("  subscribers: {}", config.subscribers.len());
    Ok(())
}
