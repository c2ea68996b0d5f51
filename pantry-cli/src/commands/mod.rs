//! CLI command implementations.

pub mod config;
pub mod mutate;
pub mod status;
pub mod watch;

use anyhow::Result;
use pantry_fetch::PantryClient;
use pantry_store::{PantryConfig, PantryEngine};
use std::sync::Arc;

/// Builds an engine for one-shot commands, without a poller.
pub(crate) fn open_engine(config: &PantryConfig) -> Result<PantryEngine> {
    config.validate()?;
    let client = PantryClient::new(
        &config.base_url(),
        config.api_key(),
        config.request_timeout(),
    )?;
    Ok(PantryEngine::new(Arc::new(client)).with_barcode_mode(config.barcode_mode))
}
