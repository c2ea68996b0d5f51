//! Status command - one reconciliation pass.

use anyhow::Result;
use tracing::debug;

use super::open_engine;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the status command.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config().await?;
    let engine = open_engine(&config)?;

    let report = engine.tick().await?;
    debug!(added = report.added.len(), "Status pass complete");

    let sensors = engine.sensors().await;
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_header(engine.source_label(), engine.last_refresh().await));
            println!();
            println!("{}", formatter.format_sensors(&sensors));
            if !cli.quiet {
                println!();
                println!("{}", formatter.format_report(&report));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = formatter.format_status(
                engine.source_label(),
                engine.last_refresh().await,
                &report,
                sensors,
            )?;
            println!("{output}");
        }
    }

    engine.close();
    Ok(())
}
