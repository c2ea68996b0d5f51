//! Watch command - poll continuously and redraw on every change.

use anyhow::Result;
use pantry_store::{PantryEngine, PantryIntegration, TickReport};
use std::io::{Write, stdout};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the watch command until Ctrl+C.
pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config().await?;
    info!(
        interval = config.update_interval,
        source = %config.base_url(),
        "Starting watch mode"
    );

    let integration = PantryIntegration::setup(config).await?;
    let engine = integration.engine().clone();
    let mut rx = engine.subscribe();
    let mut reports = engine.subscribe_reports();

    announce(integration.initial_report());
    render(&engine, cli).await?;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    warn!("Change notifications ended");
                    break;
                }
                render(&engine, cli).await?;
            }
            report = reports.recv() => match report {
                Ok(report) => announce(&report),
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "Fell behind on tick reports");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    integration.shutdown().await;
    Ok(())
}

/// Logs the projections a tick created and retired.
fn announce(report: &TickReport) {
    for sensor in &report.added {
        info!(entity_id = %sensor.entity_id, name = %sensor.name, "Sensor added");
    }
    for entity_id in &report.removed {
        info!(entity_id = %entity_id, "Sensor removed");
    }
}

async fn render(engine: &PantryEngine, cli: &Cli) -> Result<()> {
    let sensors = engine.sensors().await;
    let refreshed = engine.last_refresh().await;
    let report = engine.last_report().await;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);

            // Clear screen
            print!("\x1b[2J\x1b[H");
            println!("{}", formatter.format_header(engine.source_label(), refreshed));
            println!("{}", "─".repeat(50));
            println!();
            println!("{}", formatter.format_sensors(&sensors));
            if let Some(report) = report.filter(|_| !cli.quiet) {
                println!();
                println!("{}", formatter.format_report(&report));
            }
            if !cli.quiet {
                println!();
                println!("Press Ctrl+C to exit");
            }
        }
        OutputFormat::Json => {
            // One document per line so the stream can be piped.
            let formatter = JsonFormatter::new(false);
            println!("{}", formatter.format(&sensors)?);
        }
    }

    stdout().flush()?;
    Ok(())
}
