// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Pantry Tracker Store
//!
//! Reconciliation engine and integration lifecycle for Pantry Tracker.
//!
//! This crate provides:
//!
//! - **PantryEngine**: Owns the projections, runs ticks and count services
//! - **Poller**: Fixed-interval tick scheduling
//! - **PantryIntegration**: Setup and shutdown of one configured instance
//! - **PantryConfig**: Versioned configuration with migration
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use pantry_store::{PantryConfig, PantryIntegration};
//!
//! let config = PantryConfig::load(&PantryConfig::default_path()).await?;
//! let integration = PantryIntegration::setup(config).await?;
//!
//! // Subscribe to changes
//! let mut rx = integration.engine().subscribe();
//! while rx.changed().await.is_ok() {
//!     println!("{} products", integration.engine().product_count().await);
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod integration;
pub mod persistence;
pub mod poller;
mod registry;
pub mod services;

pub use config::{BarcodeMode, CONFIG_VERSION, ConfigOverrides, PantryConfig};
pub use engine::PantryEngine;
pub use error::StoreError;
pub use integration::PantryIntegration;
pub use persistence::{default_config_dir, default_config_path, load_json, save_json};
pub use poller::Poller;
pub use registry::TickReport;
pub use services::{CountChange, SERVICE_NAMES, ServiceCall, ServiceTarget};

#[cfg(test)]
mod engine_tests;
#[cfg(test)]
mod test_support;
