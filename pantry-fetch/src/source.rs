//! The remote pantry source seam.
//!
//! [`PantrySource`] is what the reconciliation engine talks to. The HTTP
//! implementation is [`crate::PantryClient`]; tests substitute in-memory
//! sources.

use async_trait::async_trait;
use pantry_core::{CollectionKind, CountAction, CountTable};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::FetchError;

// ============================================================================
// Collections
// ============================================================================

/// One fetched collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    /// Category labels.
    Categories(Vec<String>),
    /// Raw product records.
    Products(Vec<Value>),
    /// Count table.
    Counts(CountTable),
}

impl Collection {
    /// The empty collection of the given kind.
    pub fn empty(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Categories => Self::Categories(Vec::new()),
            CollectionKind::Products => Self::Products(Vec::new()),
            CollectionKind::Counts => Self::Counts(CountTable::new()),
        }
    }

    /// Which collection this is.
    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Categories(_) => CollectionKind::Categories,
            Self::Products(_) => CollectionKind::Products,
            Self::Counts(_) => CollectionKind::Counts,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Categories(items) => items.len(),
            Self::Products(items) => items.len(),
            Self::Counts(table) => table.len(),
        }
    }

    /// Returns true if the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A failed collection fetch that was degraded to empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFailure {
    /// Collection that failed.
    pub kind: CollectionKind,
    /// Rendered error.
    pub message: String,
}

/// The three collections fetched for one reconciliation pass.
///
/// Each collection is either the fresh remote value or empty if its
/// endpoint failed; failures are isolated per endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    /// Category labels.
    pub categories: Vec<String>,
    /// Raw product records.
    pub products: Vec<Value>,
    /// Count table.
    pub counts: CountTable,
    /// Collections that were degraded to empty.
    pub failures: Vec<CollectionFailure>,
}

impl RemoteSnapshot {
    /// Returns true if the given collection failed this pass.
    pub fn failed(&self, kind: CollectionKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }
}

// ============================================================================
// Source Trait
// ============================================================================

/// Accessor for the remote pantry service.
///
/// The raw `fetch_*` methods report errors; [`fetch_collection`] and
/// [`fetch_snapshot`] apply the degrade-to-empty policy on top of them.
///
/// [`fetch_collection`]: PantrySource::fetch_collection
/// [`fetch_snapshot`]: PantrySource::fetch_snapshot
#[async_trait]
pub trait PantrySource: Send + Sync {
    /// Human-readable label for logs (usually the base URL).
    fn label(&self) -> &str;

    /// Fetches the category list.
    async fn fetch_categories(&self) -> Result<Vec<String>, FetchError>;

    /// Fetches the raw product records.
    async fn fetch_products(&self) -> Result<Vec<Value>, FetchError>;

    /// Fetches the count table.
    async fn fetch_counts(&self) -> Result<CountTable, FetchError>;

    /// Submits a count change and returns the count the server reports.
    async fn update_count(
        &self,
        product_name: &str,
        action: CountAction,
        amount: i64,
    ) -> Result<i64, FetchError>;

    /// Releases the underlying session.
    ///
    /// Returns true only for the call that actually closed it.
    fn close(&self) -> bool {
        false
    }

    /// Fetches one collection, logging and describing any failure.
    async fn fetch_collection_checked(
        &self,
        kind: CollectionKind,
    ) -> Result<Collection, CollectionFailure> {
        let result = match kind {
            CollectionKind::Categories => self.fetch_categories().await.map(Collection::Categories),
            CollectionKind::Products => self.fetch_products().await.map(Collection::Products),
            CollectionKind::Counts => self.fetch_counts().await.map(Collection::Counts),
        };

        result.map_err(|e| {
            if let FetchError::UnexpectedShape { .. } = e {
                warn!(source = %self.label(), collection = %kind, error = %e, "Malformed collection, using empty");
            } else {
                error!(source = %self.label(), collection = %kind, error = %e, "Failed to fetch collection, using empty");
            }
            CollectionFailure {
                kind,
                message: e.to_string(),
            }
        })
    }

    /// Fetches one collection, degrading any failure to the empty collection.
    async fn fetch_collection(&self, kind: CollectionKind) -> Collection {
        self.fetch_collection_checked(kind)
            .await
            .unwrap_or_else(|_| Collection::empty(kind))
    }

    /// Fetches all three collections concurrently.
    ///
    /// Never fails: each failed collection is empty and listed in
    /// [`RemoteSnapshot::failures`].
    async fn fetch_snapshot(&self) -> RemoteSnapshot {
        let (categories, products, counts) = futures::join!(
            self.fetch_collection_checked(CollectionKind::Categories),
            self.fetch_collection_checked(CollectionKind::Products),
            self.fetch_collection_checked(CollectionKind::Counts),
        );

        let mut snapshot = RemoteSnapshot::default();
        for result in [categories, products, counts] {
            match result {
                Ok(Collection::Categories(items)) => snapshot.categories = items,
                Ok(Collection::Products(items)) => snapshot.products = items,
                Ok(Collection::Counts(table)) => snapshot.counts = table,
                Err(failure) => snapshot.failures.push(failure),
            }
        }
        snapshot
    }
}
