//! Domain models for Pantry Tracker.
//!
//! ## Submodules
//!
//! - [`identity`] - Entity identities and name sanitizing
//! - [`product`] - Remote product records
//! - [`sensor`] - Local projections (categories aggregate, product sensors)
//! - [`collection`] - Remote collection kinds, count table, count actions

pub mod collection;
pub mod identity;
pub mod product;
pub mod sensor;

pub use collection::{CollectionKind, CountAction, CountTable};
pub use identity::{CATEGORIES_ENTITY_ID, EntityId, PRODUCT_PREFIX, sanitize};
pub use product::{Attributes, ProductRecord};
pub use sensor::{CategoriesSensor, ProductSensor, Projection, SensorState};
