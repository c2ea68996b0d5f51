//! Increase/decrease commands - apply a count service.

use anyhow::Result;
use clap::{ArgGroup, Args};
use pantry_core::CountAction;
use pantry_store::ServiceCall;
use tracing::info;

use super::open_engine;
use crate::output::{ChangesOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the increase and decrease commands.
#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["entity", "barcode"])))]
pub struct MutateArgs {
    /// Product identity, e.g. sensor.product_milk.
    #[arg(long, short)]
    pub entity: Option<String>,

    /// Barcode; every product carrying it is changed.
    #[arg(long, short)]
    pub barcode: Option<String>,

    /// Amount to change the count by.
    #[arg(long, short, default_value_t = 1)]
    pub amount: i64,
}

impl MutateArgs {
    /// Builds the service call for this invocation.
    pub fn to_call(&self, action: CountAction) -> Result<ServiceCall> {
        match (&self.entity, &self.barcode) {
            (Some(entity), None) => Ok(ServiceCall::by_entity(action, entity.as_str(), self.amount)),
            (None, Some(barcode)) => Ok(ServiceCall::by_barcode(action, barcode.clone(), self.amount)),
            _ => anyhow::bail!("pass exactly one of --entity or --barcode"),
        }
    }
}

/// Runs a count change.
///
/// A reconciliation pass runs first so the engine knows the current
/// products before the service is applied.
pub async fn run(args: &MutateArgs, action: CountAction, cli: &Cli) -> Result<()> {
    let call = args.to_call(action)?;
    let service = call.service_name();

    let config = cli.load_config().await?;
    let engine = open_engine(&config)?;
    engine.tick().await?;

    let result = engine.call(call).await;
    engine.close();
    let changes = result?;

    info!(service, changed = changes.len(), "Service applied");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_changes(&changes));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!(
                "{}",
                formatter.format(&ChangesOutput {
                    service,
                    changes: &changes,
                })?
            );
        }
    }

    Ok(())
}
