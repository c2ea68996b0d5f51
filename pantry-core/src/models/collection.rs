//! Remote collections and count mutations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::identity::EntityId;

/// Stock counts keyed by product identity.
pub type CountTable = HashMap<EntityId, i64>;

/// The three read collections exposed by the remote pantry service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// `GET /categories`, a JSON array of labels.
    Categories,
    /// `GET /products`, a JSON array of product objects.
    Products,
    /// `GET /counts`, a JSON object of identity to count.
    Counts,
}

impl CollectionKind {
    /// Endpoint path relative to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Categories => "/categories",
            Self::Products => "/products",
            Self::Counts => "/counts",
        }
    }

    /// The JSON container type this collection must arrive as.
    pub fn expected_shape(&self) -> &'static str {
        match self {
            Self::Categories | Self::Products => "array",
            Self::Counts => "object",
        }
    }

    /// All collections, in fetch order.
    pub fn all() -> &'static [CollectionKind] {
        &[Self::Categories, Self::Products, Self::Counts]
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Categories => write!(f, "categories"),
            Self::Products => write!(f, "products"),
            Self::Counts => write!(f, "counts"),
        }
    }
}

/// Direction of a count mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountAction {
    /// Add to the stock count.
    Increase,
    /// Subtract from the stock count.
    Decrease,
}

impl CountAction {
    /// Applies the mutation locally. The result never goes below zero in
    /// either direction, so a negative increase is clamped like a decrease.
    pub fn apply(&self, current: i64, amount: i64) -> i64 {
        let next = match self {
            Self::Increase => current.saturating_add(amount),
            Self::Decrease => current.saturating_sub(amount),
        };
        next.max(0)
    }

    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

impl fmt::Display for CountAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
