//! Entity identities.
//!
//! Every projection is addressed by an [`EntityId`]. Product identities are a
//! pure function of the product name; the categories aggregate has a fixed
//! identity that is never retired.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespace prefix shared by all product identities.
pub const PRODUCT_PREFIX: &str = "sensor.product_";

/// Fixed identity of the categories aggregate projection.
pub const CATEGORIES_ENTITY_ID: &str = "pantry_categories";

/// Prefix applied to entity ids to form registry unique ids.
pub const UNIQUE_ID_PREFIX: &str = "pantry_tracker_";

/// Stable identity of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derives the identity of a product from its name.
    ///
    /// The name is lower-cased, spaces and hyphens become underscores, and
    /// the product namespace is prepended. Names that already carry the
    /// namespace are not prefixed twice, so sanitizing an identity is a no-op.
    pub fn from_product_name(name: &str) -> Self {
        let normalized = normalize(name);
        if normalized.starts_with(PRODUCT_PREFIX) {
            Self(normalized)
        } else {
            Self(format!("{PRODUCT_PREFIX}{normalized}"))
        }
    }

    /// Identity of the categories aggregate.
    pub fn categories() -> Self {
        Self(CATEGORIES_ENTITY_ID.to_string())
    }

    /// Wraps an identity string as received from the host or the counts table.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns true for the categories aggregate identity.
    pub fn is_categories(&self) -> bool {
        self.0 == CATEGORIES_ENTITY_ID
    }

    /// Returns the registry unique id for this identity.
    pub fn unique_id(&self) -> String {
        if self.is_categories() {
            format!("{UNIQUE_ID_PREFIX}categories")
        } else {
            format!("{UNIQUE_ID_PREFIX}{}", self.0)
        }
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Sanitizes a product name into its identity string.
pub fn sanitize(name: &str) -> String {
    EntityId::from_product_name(name).0
}

fn normalize(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}
