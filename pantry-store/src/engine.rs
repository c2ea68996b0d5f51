//! The reconciliation engine.
//!
//! Owns the projection registry, runs ticks against a [`PantrySource`] and
//! applies the four count services. Ticks and service calls hold the
//! operation lock for their whole duration so their state-mutating sections
//! never interleave; the registry lock is only held while applying or
//! reading.

use chrono::{DateTime, Utc};
use pantry_core::{CountAction, EntityId, SensorState};
use pantry_fetch::PantrySource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Mutex, RwLock, broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::config::BarcodeMode;
use crate::error::StoreError;
use crate::registry::{Registry, TickReport};
use crate::services::{CountChange, ServiceCall, ServiceTarget};

/// Tick reports buffered per report subscriber before it lags.
const REPORT_CAPACITY: usize = 16;

/// Clears the refreshing flag when a tick ends or is dropped.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Pantry Engine
// ============================================================================

/// Periodic reconciliation engine for one integration instance.
///
/// Observable via [`PantryEngine::subscribe`]: the version counter is bumped
/// after every tick and every applied count change. Every tick report,
/// including those of poller-driven ticks, is also published to
/// [`PantryEngine::subscribe_reports`] so the host can register the
/// projections a tick created and drop the ones it retired.
pub struct PantryEngine {
    source: Arc<dyn PantrySource>,
    state: RwLock<Registry>,
    op_lock: Mutex<()>,
    refreshing: AtomicBool,
    closed: AtomicBool,
    barcode_mode: BarcodeMode,
    notify: watch::Sender<u64>,
    version: RwLock<u64>,
    reports: broadcast::Sender<Arc<TickReport>>,
    last_report: RwLock<Option<Arc<TickReport>>>,
}

impl std::fmt::Debug for PantryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PantryEngine")
            .field("source", &self.source.label())
            .field("barcode_mode", &self.barcode_mode)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl PantryEngine {
    /// Creates an engine over a remote source. Only the categories
    /// aggregate exists until the first tick.
    pub fn new(source: Arc<dyn PantrySource>) -> Self {
        let (notify, _) = watch::channel(0);
        let (reports, _) = broadcast::channel(REPORT_CAPACITY);
        Self {
            source,
            state: RwLock::new(Registry::new()),
            op_lock: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            barcode_mode: BarcodeMode::default(),
            notify,
            version: RwLock::new(0),
            reports,
            last_report: RwLock::new(None),
        }
    }

    /// Sets how by-barcode changes are applied.
    #[must_use]
    pub fn with_barcode_mode(mut self, mode: BarcodeMode) -> Self {
        self.barcode_mode = mode;
        self
    }

    // ========================================================================
    // Ticks
    // ========================================================================

    /// Runs one reconciliation pass, waiting for any running operation.
    ///
    /// Collection failures never fail the tick; they are listed in the
    /// report and the affected collection is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] once the engine has been closed.
    pub async fn tick(&self) -> Result<TickReport, StoreError> {
        self.ensure_open()?;
        let _op = self.op_lock.lock().await;
        self.ensure_open()?;
        Ok(self.run_tick().await)
    }

    /// Runs one reconciliation pass unless another operation is running.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RefreshInProgress`] if the engine is busy, or
    /// [`StoreError::Closed`] once it has been closed.
    pub async fn try_tick(&self) -> Result<TickReport, StoreError> {
        self.ensure_open()?;
        let _op = self
            .op_lock
            .try_lock()
            .map_err(|_| StoreError::RefreshInProgress)?;
        Ok(self.run_tick().await)
    }

    async fn run_tick(&self) -> TickReport {
        self.refreshing.store(true, Ordering::SeqCst);
        let _refreshing = RefreshGuard(&self.refreshing);
        let started = Instant::now();

        debug!(source = %self.source.label(), "Starting tick");
        let snapshot = self.source.fetch_snapshot().await;
        let report = self.state.write().await.apply(snapshot);
        self.publish_report(&report).await;
        self.notify_change().await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if report.failures.is_empty() {
            debug!(
                added = report.added.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                skipped = report.skipped,
                elapsed_ms,
                "Tick complete"
            );
        } else {
            warn!(
                added = report.added.len(),
                removed = report.removed.len(),
                failures = report.failures.len(),
                elapsed_ms,
                "Tick complete with degraded collections"
            );
        }
        report
    }

    /// Returns true while a tick is running.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Count Services
    // ========================================================================

    /// Increases a product's count through the remote service.
    ///
    /// # Errors
    ///
    /// See [`PantryEngine::call`].
    pub async fn increase_by_id(
        &self,
        entity_id: &EntityId,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        self.change_by_id(entity_id, CountAction::Increase, amount).await
    }

    /// Decreases a product's count through the remote service.
    ///
    /// # Errors
    ///
    /// See [`PantryEngine::call`].
    pub async fn decrease_by_id(
        &self,
        entity_id: &EntityId,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        self.change_by_id(entity_id, CountAction::Decrease, amount).await
    }

    /// Increases the count of every product carrying `barcode`.
    ///
    /// # Errors
    ///
    /// See [`PantryEngine::call`].
    pub async fn increase_by_barcode(
        &self,
        barcode: &str,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        self.change_by_barcode(barcode, CountAction::Increase, amount).await
    }

    /// Decreases the count of every product carrying `barcode`, never below 0.
    ///
    /// # Errors
    ///
    /// See [`PantryEngine::call`].
    pub async fn decrease_by_barcode(
        &self,
        barcode: &str,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        self.change_by_barcode(barcode, CountAction::Decrease, amount).await
    }

    /// Dispatches a parsed service call.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EntityNotFound`] if nothing matches the target
    /// - [`StoreError::Fetch`] if the remote service refused or failed the
    ///   change; local counts are left as they were
    /// - [`StoreError::Closed`] once the engine has been closed
    pub async fn call(&self, call: ServiceCall) -> Result<Vec<CountChange>, StoreError> {
        debug!(service = call.service_name(), subject = %call.target, amount = call.amount, "Service call");
        match call.target {
            ServiceTarget::Entity(id) => self.change_by_id(&id, call.action, call.amount).await,
            ServiceTarget::Barcode(code) => {
                self.change_by_barcode(&code, call.action, call.amount).await
            }
        }
    }

    async fn change_by_id(
        &self,
        entity_id: &EntityId,
        action: CountAction,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        self.ensure_open()?;
        let _op = self.op_lock.lock().await;
        self.ensure_open()?;

        let product_name = self
            .state
            .read()
            .await
            .product(entity_id)
            .map(|sensor| sensor.product_name().to_string())
            .ok_or_else(|| not_found(entity_id.as_str()))?;

        let count = self
            .source
            .update_count(&product_name, action, amount)
            .await
            .map_err(|e| {
                error!(entity_id = %entity_id, action = %action, error = %e, "Count update failed");
                StoreError::from(e)
            })?;

        let change = {
            let mut state = self.state.write().await;
            let sensor = state
                .product_mut(entity_id)
                .ok_or_else(|| not_found(entity_id.as_str()))?;
            let previous = sensor.count();
            sensor.update_count(count);
            CountChange {
                entity_id: entity_id.clone(),
                previous,
                count,
            }
        };
        debug!(entity_id = %entity_id, previous = change.previous, count, "Count confirmed by server");

        self.notify_change().await;
        Ok(vec![change])
    }

    async fn change_by_barcode(
        &self,
        barcode: &str,
        action: CountAction,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        self.ensure_open()?;
        let _op = self.op_lock.lock().await;
        self.ensure_open()?;

        match self.barcode_mode {
            BarcodeMode::Local => {
                let changes = {
                    let mut state = self.state.write().await;
                    let targets = state.matching_barcode(barcode);
                    if targets.is_empty() {
                        return Err(not_found(&format!("barcode {barcode}")));
                    }
                    let mut changes = Vec::with_capacity(targets.len());
                    for id in targets {
                        if let Some(sensor) = state.product_mut(&id) {
                            let previous = sensor.count();
                            let count = action.apply(previous, amount);
                            sensor.update_count(count);
                            debug!(entity_id = %id, barcode, previous, count, "Count changed locally");
                            changes.push(CountChange {
                                entity_id: id,
                                previous,
                                count,
                            });
                        }
                    }
                    changes
                };
                self.notify_change().await;
                Ok(changes)
            }
            BarcodeMode::Remote => self.change_by_barcode_remote(barcode, action, amount).await,
        }
    }

    /// Sends one remote update per matching product, in identity order.
    /// Stops at the first failure; changes already confirmed stay applied.
    async fn change_by_barcode_remote(
        &self,
        barcode: &str,
        action: CountAction,
        amount: i64,
    ) -> Result<Vec<CountChange>, StoreError> {
        let targets: Vec<(EntityId, String)> = {
            let state = self.state.read().await;
            state
                .matching_barcode(barcode)
                .into_iter()
                .filter_map(|id| {
                    let name = state.product(&id)?.product_name().to_string();
                    Some((id, name))
                })
                .collect()
        };
        if targets.is_empty() {
            return Err(not_found(&format!("barcode {barcode}")));
        }

        let mut changes = Vec::with_capacity(targets.len());
        for (id, name) in targets {
            let count = match self.source.update_count(&name, action, amount).await {
                Ok(count) => count,
                Err(e) => {
                    error!(entity_id = %id, barcode, error = %e, "Count update failed");
                    if !changes.is_empty() {
                        self.notify_change().await;
                    }
                    return Err(e.into());
                }
            };
            if let Some(sensor) = self.state.write().await.product_mut(&id) {
                let previous = sensor.count();
                sensor.update_count(count);
                changes.push(CountChange {
                    entity_id: id,
                    previous,
                    count,
                });
            }
        }

        self.notify_change().await;
        Ok(changes)
    }

    // ========================================================================
    // Read Access
    // ========================================================================

    /// Host view of one projection.
    pub async fn sensor(&self, entity_id: &EntityId) -> Option<SensorState> {
        self.state.read().await.get(entity_id).map(|p| p.state())
    }

    /// Host view of every projection, categories aggregate first.
    pub async fn sensors(&self) -> Vec<SensorState> {
        let mut states = self.state.read().await.states();
        states.sort_by_key(|s| !s.entity_id.is_categories());
        states
    }

    /// Number of live product projections.
    pub async fn product_count(&self) -> usize {
        self.state.read().await.products().count()
    }

    /// The current category list.
    pub async fn categories(&self) -> Vec<String> {
        self.state.read().await.categories()
    }

    /// When the last tick completed.
    pub async fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_refresh()
    }

    /// Label of the remote source.
    pub fn source_label(&self) -> &str {
        self.source.label()
    }

    // ========================================================================
    // Observable
    // ========================================================================

    /// Subscribes to engine changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Subscribes to the report of every tick from now on.
    ///
    /// A receiver that falls more than a few reports behind gets
    /// [`broadcast::error::RecvError::Lagged`] and should resync from
    /// [`PantryEngine::sensors`].
    pub fn subscribe_reports(&self) -> broadcast::Receiver<Arc<TickReport>> {
        self.reports.subscribe()
    }

    /// Report of the most recent tick.
    pub async fn last_report(&self) -> Option<Arc<TickReport>> {
        self.last_report.read().await.clone()
    }

    async fn publish_report(&self, report: &TickReport) {
        let report = Arc::new(report.clone());
        *self.last_report.write().await = Some(report.clone());
        // No receivers is fine.
        let _ = self.reports.send(report);
    }

    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Closes the engine and its source.
    ///
    /// Returns true only for the call that performed the close.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let source_closed = self.source.close();
        info!(source = %self.source.label(), source_closed, "Pantry engine closed");
        true
    }

    /// Returns true once [`PantryEngine::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) async fn op_lock_for_test(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.op_lock.lock().await
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

fn not_found(target: &str) -> StoreError {
    error!(missing = %target, "No matching projection");
    StoreError::EntityNotFound(target.to_string())
}
