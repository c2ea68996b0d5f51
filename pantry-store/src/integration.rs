//! Integration lifecycle: setup and shutdown for one configured instance.

use pantry_fetch::{PantryClient, PantrySource};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

use crate::config::PantryConfig;
use crate::engine::PantryEngine;
use crate::error::StoreError;
use crate::poller::Poller;
use crate::registry::TickReport;

/// A running Pantry Tracker instance: engine plus poller.
#[derive(Debug)]
pub struct PantryIntegration {
    engine: Arc<PantryEngine>,
    poller: Mutex<Option<Poller>>,
    config: PantryConfig,
    initial: TickReport,
}

impl PantryIntegration {
    /// Validates the config, opens the HTTP session, runs the first tick
    /// and starts polling.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the session cannot be
    /// created. Remote failures during the first tick are not errors.
    #[instrument(skip(config), fields(host = %config.host, port = config.port))]
    pub async fn setup(config: PantryConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let client = PantryClient::new(
            &config.base_url(),
            config.api_key(),
            config.request_timeout(),
        )?;
        Self::setup_with_source(config, Arc::new(client)).await
    }

    /// Like [`PantryIntegration::setup`] with a caller-supplied source.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid.
    pub async fn setup_with_source(
        config: PantryConfig,
        source: Arc<dyn PantrySource>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let engine = Arc::new(PantryEngine::new(source).with_barcode_mode(config.barcode_mode));

        let initial = engine.tick().await?;
        info!(
            products = initial.added.len(),
            categories = initial.categories,
            "Pantry integration ready"
        );

        let poller = Poller::start(Arc::clone(&engine), config.update_interval());
        Ok(Self {
            engine,
            poller: Mutex::new(Some(poller)),
            config,
            initial,
        })
    }

    /// The engine, for services and reads.
    pub fn engine(&self) -> &Arc<PantryEngine> {
        &self.engine
    }

    /// The effective configuration.
    pub fn config(&self) -> &PantryConfig {
        &self.config
    }

    /// Report of the tick run during setup; its `added` list is the set of
    /// projections to register with the host.
    pub fn initial_report(&self) -> &TickReport {
        &self.initial
    }

    /// Returns true while the poller is running.
    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .map(|guard| guard.as_ref().is_some_and(Poller::is_running))
            .unwrap_or(false)
    }

    /// Stops the poller, then closes the engine and its session.
    ///
    /// Returns true only for the call that performed the shutdown.
    pub async fn shutdown(&self) -> bool {
        let poller = self.poller.lock().ok().and_then(|mut guard| guard.take());
        if let Some(poller) = poller {
            poller.stop().await;
        }
        let closed = self.engine.close();
        if closed {
            info!("Pantry integration shut down");
        }
        closed
    }
}
