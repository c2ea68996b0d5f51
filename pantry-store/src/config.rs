//! Integration configuration.
//!
//! Stored as versioned JSON. Version 1 kept the remote service as a single
//! `source` URL; version 2 splits it into `host` and `port`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::StoreError;
use crate::persistence::{default_config_path, load_json, save_json};

/// Current config schema version.
pub const CONFIG_VERSION: u32 = 2;

/// Default polling interval in seconds.
pub const DEFAULT_UPDATE_INTERVAL: u64 = 30;

/// Default host of the pantry service.
pub const DEFAULT_HOST: &str = "homeassistant.local";

/// Default port of the pantry service.
pub const DEFAULT_PORT: u16 = 8099;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = pantry_fetch::DEFAULT_TIMEOUT_SECS;

// ============================================================================
// Barcode Mode
// ============================================================================

/// How by-barcode count changes are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarcodeMode {
    /// Count is computed locally; the remote service is not told.
    #[default]
    Local,
    /// Each matching product is updated through the remote service.
    Remote,
}

// ============================================================================
// Config
// ============================================================================

/// Pantry Tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryConfig {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Polling interval in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    /// Bare hostname of the pantry service.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the pantry service.
    #[serde(default = "default_port")]
    pub port: u16,
    /// API key sent as `X-API-KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// How by-barcode changes are applied.
    #[serde(default)]
    pub barcode_mode: BarcodeMode,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for PantryConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            update_interval: DEFAULT_UPDATE_INTERVAL,
            host: default_host(),
            port: DEFAULT_PORT,
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            barcode_mode: BarcodeMode::Local,
        }
    }
}

impl PantryConfig {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from a file, migrating older schemas.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not JSON, or cannot
    /// be migrated to the current schema.
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        info!(path = %path.display(), "Loading config");
        let document: Value = load_json(path).await?;
        Self::from_document(document)
    }

    /// Saves configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Parses a stored document of any supported version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] for unknown versions or a version 1
    /// source URL without both host and port.
    pub fn from_document(document: Value) -> Result<Self, StoreError> {
        let version = match document.get("version") {
            None => 1,
            Some(v) => v
                .as_u64()
                .ok_or_else(|| StoreError::Migration(format!("invalid version field: {v}")))?,
        };

        match version {
            1 => Self::migrate_v1(&document),
            2 => Ok(serde_json::from_value(document)?),
            other => Err(StoreError::Migration(format!(
                "unsupported config version {other}"
            ))),
        }
    }

    /// Returns true if the stored document predates the current schema.
    pub fn needs_migration(document: &Value) -> bool {
        document
            .get("version")
            .and_then(Value::as_u64)
            .is_none_or(|v| v < u64::from(CONFIG_VERSION))
    }

    fn migrate_v1(document: &Value) -> Result<Self, StoreError> {
        let source = document
            .get("source")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Migration("version 1 config has no 'source'".into()))?;

        let url = Url::parse(source)
            .map_err(|e| StoreError::Migration(format!("invalid source URL '{source}': {e}")))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| StoreError::Migration(format!("source URL '{source}' has no host")))?;
        // `Url` drops a port equal to the scheme default, so check the text.
        let port = has_explicit_port(source)
            .then(|| url.port_or_known_default())
            .flatten()
            .ok_or_else(|| StoreError::Migration(format!("source URL '{source}' has no port")))?;

        let mut config = Self {
            host: host.to_string(),
            port,
            ..Self::default()
        };
        if let Some(interval) = document.get("update_interval").and_then(Value::as_u64) {
            config.update_interval = interval;
        }
        if let Some(key) = document.get("api_key").and_then(Value::as_str) {
            config.api_key = Some(key.to_string());
        }

        info!(host = %config.host, port = config.port, "Migrated config from version 1");
        Ok(config)
    }

    /// Validates field values.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.update_interval == 0 {
            return Err(StoreError::Config(
                "update_interval must be a positive number of seconds".into(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(StoreError::Config("host must not be empty".into()));
        }
        if self.host.contains("://") {
            return Err(StoreError::Config(format!(
                "host '{}' must be a bare hostname without a scheme",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(StoreError::Config("port must be non-zero".into()));
        }
        if self.request_timeout == 0 {
            return Err(StoreError::Config("request_timeout must be positive".into()));
        }
        Ok(())
    }

    /// Base URL of the pantry service.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// The API key, if one is configured and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Polling interval.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Applies per-run overrides on top of the stored values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(host) = &overrides.host {
            self.host.clone_from(host);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(key) = &overrides.api_key {
            self.api_key = Some(key.clone());
        }
        if let Some(interval) = overrides.update_interval {
            self.update_interval = interval;
        }
        self
    }
}

/// Per-run values that take precedence over the stored config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Host override.
    pub host: Option<String>,
    /// Port override.
    pub port: Option<u16>,
    /// API key override.
    pub api_key: Option<String>,
    /// Interval override in seconds.
    pub update_interval: Option<u64>,
}

impl ConfigOverrides {
    /// Returns true if no override is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Returns true if the authority of `source` names a port.
fn has_explicit_port(source: &str) -> bool {
    let rest = source.split_once("://").map_or(source, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    // Skip past an IPv6 literal before looking for the separator.
    let tail = host_port.rsplit_once(']').map_or(host_port, |(_, tail)| tail);
    tail.rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
}
