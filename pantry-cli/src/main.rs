// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Pantry Tracker CLI - mirror a remote pantry inventory from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Poll and print sensors on every change
//! pantry
//!
//! # One reconciliation pass as JSON
//! pantry status --format json --pretty
//!
//! # Count changes
//! pantry increase --entity sensor.product_milk --amount 2
//! pantry decrease --barcode 012345
//!
//! # Configuration
//! pantry config set --host pantry.lan --port 8099
//! pantry config migrate
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pantry_store::{ConfigOverrides, PantryConfig, StoreError};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, mutate, status, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// Pantry Tracker CLI.
#[derive(Parser)]
#[command(name = "pantry")]
#[command(about = "Mirror a remote pantry inventory as local sensors")]
#[command(long_about = r#"
Pantry Tracker polls a pantry service for categories, products and stock
counts, and keeps one sensor per product in sync with it.

Examples:
  pantry                                   # Watch (default)
  pantry status --format json              # Single pass as JSON
  pantry increase --entity sensor.product_milk
  pantry decrease --barcode 012345 --amount 2
  pantry config show
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'watch' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to the platform config directory).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Pantry service host for this run.
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Pantry service port for this run.
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// API key for this run.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Polling interval in seconds for this run.
    #[arg(long, global = true)]
    pub interval: Option<u64>,
}

impl Cli {
    /// The config file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(PantryConfig::default_path)
    }

    /// Per-run overrides from the command line.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            api_key: self.api_key.clone(),
            update_interval: self.interval,
        }
    }

    /// Loads the stored config with command-line overrides applied.
    pub async fn load_config(&self) -> Result<PantryConfig> {
        let config = PantryConfig::load(&self.config_path()).await?;
        Ok(config.with_overrides(&self.overrides()))
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll continuously and print sensors on every change (default).
    #[command(visible_alias = "w")]
    Watch,

    /// Run one reconciliation pass and print the sensors.
    #[command(visible_alias = "s")]
    Status,

    /// Increase a product count.
    Increase(mutate::MutateArgs),

    /// Decrease a product count.
    Decrease(mutate::MutateArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// General error.
    Error = 1,
    /// No product matches the given identity or barcode.
    NotFound = 2,
    /// Invalid configuration.
    Config = 3,
}

impl ExitCode {
    fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<StoreError>() {
            Some(StoreError::EntityNotFound(_)) => Self::NotFound,
            Some(StoreError::Config(_) | StoreError::Migration(_)) => Self::Config,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("pantry=debug,info")
    } else {
        EnvFilter::new("pantry=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Watch) | None => watch::run(&cli).await,
        Some(Commands::Status) => status::run(&cli).await,
        Some(Commands::Increase(args)) => {
            mutate::run(args, pantry_core::CountAction::Increase, &cli).await
        }
        Some(Commands::Decrease(args)) => {
            mutate::run(args, pantry_core::CountAction::Decrease, &cli).await
        }
        Some(Commands::Config(args)) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
