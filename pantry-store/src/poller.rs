//! Fixed-interval tick scheduling.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::PantryEngine;
use crate::error::StoreError;

/// Shortest interval the poller accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Background task that ticks an engine at a fixed interval.
///
/// The first tick fires one interval after start. A tick that overruns the
/// interval pushes the next one to the following boundary instead of
/// running late ticks back to back.
#[derive(Debug)]
pub struct Poller {
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Poller {
    /// Starts polling on the current tokio runtime.
    pub fn start(engine: Arc<PantryEngine>, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        info!(interval_secs = interval.as_secs(), "Starting poller");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match engine.tick().await {
                    Ok(report) => {
                        debug!(products_added = report.added.len(), "Scheduled tick done");
                    }
                    Err(StoreError::Closed) => {
                        debug!("Engine closed, poller exiting");
                        break;
                    }
                    Err(e) => warn!(error = %e, "Scheduled tick failed"),
                }
            }
        });

        Self {
            handle: Some(handle),
            interval,
        }
    }

    /// The tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true while the polling task is alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops polling. An in-flight tick is dropped at its next await point,
    /// which aborts its outstanding requests.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            info!("Poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
