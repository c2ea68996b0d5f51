//! Projection registry and the reconciliation pass.
//!
//! [`Registry::apply`] is the synchronous half of a tick: given a fetched
//! [`RemoteSnapshot`] it updates the categories aggregate, creates, updates
//! and retires product projections, then applies the count table.

use chrono::{DateTime, Utc};
use pantry_core::{
    CategoriesSensor, EntityId, ProductRecord, ProductSensor, Projection, SensorState,
};
use pantry_fetch::{CollectionFailure, RemoteSnapshot};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, error, info};

// ============================================================================
// Tick Report
// ============================================================================

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Projections created this pass, for registration with the host.
    pub added: Vec<SensorState>,
    /// Existing projections mutated in place.
    pub updated: Vec<EntityId>,
    /// Projections retired this pass.
    pub removed: Vec<EntityId>,
    /// Product records skipped as malformed.
    pub skipped: usize,
    /// Collections degraded to empty.
    pub failures: Vec<CollectionFailure>,
    /// Number of categories after the pass.
    pub categories: usize,
}

impl TickReport {
    /// Returns true if projections were created or retired.
    pub fn changed_membership(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Engine-owned set of live projections keyed by identity.
///
/// The categories aggregate is inserted on construction and never removed.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    projections: BTreeMap<EntityId, Projection>,
    last_refresh: Option<DateTime<Utc>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub(crate) fn new() -> Self {
        let mut projections = BTreeMap::new();
        projections.insert(
            EntityId::categories(),
            Projection::Categories(CategoriesSensor::default()),
        );
        Self {
            projections,
            last_refresh: None,
        }
    }

    /// Reconciles local projections against a fetched snapshot.
    pub(crate) fn apply(&mut self, snapshot: RemoteSnapshot) -> TickReport {
        let RemoteSnapshot {
            categories,
            products,
            counts,
            failures,
        } = snapshot;

        let mut report = TickReport {
            categories: categories.len(),
            failures,
            ..TickReport::default()
        };
        let mut updated = BTreeSet::new();

        // Categories aggregate, unconditionally
        let categories_id = EntityId::categories();
        if let Some(Projection::Categories(aggregate)) = self.projections.get_mut(&categories_id) {
            aggregate.update_categories(categories);
            updated.insert(categories_id);
        }

        // Stage records so a repeated identity keeps only its last occurrence
        let mut staged: Vec<ProductRecord> = Vec::with_capacity(products.len());
        let mut index: HashMap<EntityId, usize> = HashMap::with_capacity(products.len());
        for raw in &products {
            match ProductRecord::from_value(raw) {
                Ok(record) => {
                    let id = record.entity_id();
                    if let Some(&slot) = index.get(&id) {
                        debug!(entity_id = %id, "Duplicate product identity, later record wins");
                        staged[slot] = record;
                    } else {
                        index.insert(id, staged.len());
                        staged.push(record);
                    }
                }
                Err(e) => {
                    error!(error = %e, "Skipping malformed product record");
                    report.skipped += 1;
                }
            }
        }

        let mut added = Vec::new();
        for record in staged {
            let id = record.entity_id();
            match self.projections.get_mut(&id) {
                Some(Projection::Product(sensor)) => {
                    sensor.update_attributes(record.url, record.category, record.attributes);
                    updated.insert(id);
                }
                Some(Projection::Categories(_)) => {
                    error!(entity_id = %id, "Product identity collides with categories aggregate");
                }
                None => {
                    let initial = counts.get(&id).copied().unwrap_or(0);
                    info!(entity_id = %id, name = %record.name, count = initial, "Creating product projection");
                    self.projections
                        .insert(id.clone(), Projection::Product(ProductSensor::new(record, initial)));
                    added.push(id);
                }
            }
        }

        // Retire everything not seen this pass
        let seen: HashSet<&EntityId> = index.keys().collect();
        let removed: Vec<EntityId> = self
            .projections
            .keys()
            .filter(|id| !id.is_categories() && !seen.contains(id))
            .cloned()
            .collect();
        for id in &removed {
            info!(entity_id = %id, "Retiring product projection");
            self.projections.remove(id);
        }

        // Count pass over every live product present in the table
        let fresh: HashSet<&EntityId> = added.iter().collect();
        for (id, &count) in &counts {
            let Some(sensor) = self.product_mut(id) else {
                continue;
            };
            if sensor.count() != count {
                debug!(entity_id = %id, previous = sensor.count(), count, "Applying count");
            }
            sensor.update_count(count);
            if !fresh.contains(id) {
                updated.insert(id.clone());
            }
        }

        report.added = added
            .iter()
            .filter_map(|id| self.projections.get(id).map(Projection::state))
            .collect();
        report.updated = updated.into_iter().collect();
        report.removed = removed;
        self.last_refresh = Some(Utc::now());
        report
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<&Projection> {
        self.projections.get(id)
    }

    pub(crate) fn product(&self, id: &EntityId) -> Option<&ProductSensor> {
        self.projections.get(id).and_then(Projection::as_product)
    }

    pub(crate) fn product_mut(&mut self, id: &EntityId) -> Option<&mut ProductSensor> {
        self.projections.get_mut(id).and_then(Projection::as_product_mut)
    }

    /// Product identities whose barcode attribute equals `barcode`.
    pub(crate) fn matching_barcode(&self, barcode: &str) -> Vec<EntityId> {
        self.products()
            .filter(|sensor| sensor.barcode().as_deref() == Some(barcode))
            .map(|sensor| sensor.entity_id().clone())
            .collect()
    }

    pub(crate) fn products(&self) -> impl Iterator<Item = &ProductSensor> {
        self.projections.values().filter_map(Projection::as_product)
    }

    pub(crate) fn states(&self) -> Vec<SensorState> {
        self.projections.values().map(Projection::state).collect()
    }

    pub(crate) fn categories(&self) -> Vec<String> {
        match self.projections.get(&EntityId::categories()) {
            Some(Projection::Categories(aggregate)) => aggregate.categories().to_vec(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }
}
