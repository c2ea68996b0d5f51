// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Pantry Tracker Core
//!
//! Core types shared by every Pantry Tracker crate:
//!
//! - Entity identities derived from product names
//! - Remote product records and the count table
//! - Local projections (the categories aggregate and product sensors)
//! - Error types
//!
//! ## Key Types
//!
//! - [`EntityId`] - Stable identity of a projection
//! - [`ProductRecord`] - A product as reported by the remote service
//! - [`Projection`] - Tagged variant over [`CategoriesSensor`] and [`ProductSensor`]
//! - [`SensorState`] - Serialisable host view of a projection
//! - [`CollectionKind`] / [`CountAction`] - Remote endpoints and mutations

pub mod error;
pub mod models;

pub use error::CoreError;

pub use models::{
    // Identity
    CATEGORIES_ENTITY_ID,
    EntityId,
    PRODUCT_PREFIX,
    sanitize,
    // Records
    Attributes,
    ProductRecord,
    // Projections
    CategoriesSensor,
    ProductSensor,
    Projection,
    SensorState,
    // Collections
    CollectionKind,
    CountAction,
    CountTable,
};
