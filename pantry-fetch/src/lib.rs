// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Pantry Tracker Fetch
//!
//! Access to the remote pantry service.
//!
//! - [`source::PantrySource`] - Trait the reconciliation engine talks to
//! - [`client::PantryClient`] - reqwest-backed implementation
//! - [`parser`] - Shape checks for the three read collections
//! - [`retry::RetryStrategy`] - Backoff for idempotent reads
//!
//! Reads never fail a reconciliation pass: each collection degrades to empty
//! on its own, see [`PantrySource::fetch_snapshot`].
//!
//! ## Example
//!
//! ```ignore
//! use pantry_fetch::{PantryClient, PantrySource};
//! use std::time::Duration;
//!
//! let client = PantryClient::new("http://pantry.local:8099", Some("key"), Duration::from_secs(10))?;
//! let snapshot = client.fetch_snapshot().await;
//! println!("{} products", snapshot.products.len());
//! ```

pub mod client;
pub mod error;
pub mod parser;
pub mod retry;
pub mod source;

pub use client::{API_KEY_HEADER, DEFAULT_TIMEOUT_SECS, PantryClient};
pub use error::FetchError;
pub use retry::RetryStrategy;
pub use source::{Collection, CollectionFailure, PantrySource, RemoteSnapshot};
