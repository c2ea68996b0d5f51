//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use pantry_store::{PantryConfig, StoreError, default_config_dir, load_json};
use serde_json::Value;
use tracing::info;

use crate::output::{ConfigOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Rewrite an older config file in the current schema.
    Migrate,

    /// Persist --host, --port, --api-key and --interval.
    Set,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Migrate => migrate_config(cli).await,
        ConfigAction::Set => set_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let config = cli.load_config().await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_config(&config));
        }
        OutputFormat::Json => {
            let output = ConfigOutput {
                path: cli.config_path().display().to_string(),
                base_url: config.base_url(),
                has_api_key: config.api_key().is_some(),
                config: (&config).into(),
            };
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let config_path = cli.config_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:  {}", config_dir.display());
            println!("Config file: {}", config_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": config_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn migrate_config(cli: &Cli) -> Result<()> {
    let path = cli.config_path();
    if !path.exists() {
        println!("No configuration file at {}", path.display());
        return Ok(());
    }

    let document: Value = load_json(&path).await?;
    if !PantryConfig::needs_migration(&document) {
        println!("Configuration is already current");
        return Ok(());
    }

    let config = PantryConfig::from_document(document)?;
    config.validate()?;
    config.save(&path).await?;

    info!(path = %path.display(), version = config.version, "Config migrated");
    println!("Migrated {} to version {}", path.display(), config.version);

    Ok(())
}

async fn set_config(cli: &Cli) -> Result<()> {
    let overrides = cli.overrides();
    if overrides.is_empty() {
        return Err(StoreError::Config(
            "nothing to set; pass --host, --port, --api-key or --interval".into(),
        )
        .into());
    }

    let path = cli.config_path();
    let config = PantryConfig::load(&path).await?.with_overrides(&overrides);
    config.validate()?;
    config.save(&path).await?;

    info!(path = %path.display(), "Config updated");
    println!("Saved {}", path.display());

    Ok(())
}
