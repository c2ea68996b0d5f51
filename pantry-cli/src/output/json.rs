//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use pantry_core::SensorState;
use pantry_store::{CountChange, PantryConfig, TickReport};
use serde::{Serialize, Serializer};

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for one reconciliation pass.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_datetime_opt")]
    pub refreshed_at: Option<DateTime<Utc>>,
    pub added: usize,
    pub removed: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailureOutput>,
    pub sensors: Vec<SensorState>,
}

/// A collection that degraded to empty.
#[derive(Debug, Serialize)]
pub struct FailureOutput {
    pub collection: String,
    pub error: String,
}

/// JSON output for a count change command.
#[derive(Debug, Serialize)]
pub struct ChangesOutput<'a> {
    pub service: &'a str,
    pub changes: &'a [CountChange],
}

/// Config output with the API key masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOutput<'a> {
    pub path: String,
    pub base_url: String,
    pub has_api_key: bool,
    #[serde(flatten)]
    pub config: MaskedConfig<'a>,
}

/// Stored fields minus the API key.
#[derive(Debug, Serialize)]
pub struct MaskedConfig<'a> {
    pub version: u32,
    pub host: &'a str,
    pub port: u16,
    pub update_interval: u64,
    pub request_timeout: u64,
    pub barcode_mode: pantry_store::BarcodeMode,
}

impl<'a> From<&'a PantryConfig> for MaskedConfig<'a> {
    fn from(config: &'a PantryConfig) -> Self {
        Self {
            version: config.version,
            host: &config.host,
            port: config.port,
            update_interval: config.update_interval,
            request_timeout: config.request_timeout,
            barcode_mode: config.barcode_mode,
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats a tick report together with the resulting sensors.
    pub fn format_status(
        &self,
        source: &str,
        refreshed_at: Option<DateTime<Utc>>,
        report: &TickReport,
        sensors: Vec<SensorState>,
    ) -> Result<String> {
        let output = StatusOutput {
            source: source.to_string(),
            refreshed_at,
            added: report.added.len(),
            removed: report.removed.len(),
            skipped: report.skipped,
            failures: report
                .failures
                .iter()
                .map(|f| FailureOutput {
                    collection: f.kind.to_string(),
                    error: f.message.clone(),
                })
                .collect(),
            sensors,
        };
        self.format(&output)
    }
}
