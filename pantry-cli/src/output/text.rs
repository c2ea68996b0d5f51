//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};
use pantry_core::SensorState;
use pantry_store::{CountChange, PantryConfig, TickReport};
use serde_json::Value;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Width of the name column in the sensor table.
const NAME_WIDTH: usize = 28;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats the sensor table: the categories aggregate, then one line
    /// per product.
    pub fn format_sensors(&self, sensors: &[SensorState]) -> String {
        let mut lines = Vec::new();

        for sensor in sensors {
            if sensor.entity_id.is_categories() {
                lines.push(format!(
                    "{} {}",
                    self.bold(&format!("{:<NAME_WIDTH$}", sensor.name)),
                    self.cyan(&sensor.state.to_string())
                ));
                if let Some(Value::Array(items)) = sensor.attributes.get("categories") {
                    let labels: Vec<String> = items.iter().map(render).collect();
                    if !labels.is_empty() {
                        lines.push(self.dim(&format!("  {}", labels.join(", "))));
                    }
                }
                lines.push("─".repeat(50));
            }
        }

        let products: Vec<&SensorState> = sensors
            .iter()
            .filter(|s| !s.entity_id.is_categories())
            .collect();
        if products.is_empty() {
            lines.push(self.dim("No products"));
        }
        for sensor in products {
            let category = sensor
                .attributes
                .get("category")
                .map(render)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "−".to_string());
            lines.push(format!(
                "{:<NAME_WIDTH$} {} {}",
                sensor.name,
                self.color_for_count(sensor.state),
                self.dim(&category)
            ));
        }

        lines.join("\n")
    }

    /// Formats a one-line summary of a tick.
    pub fn format_report(&self, report: &TickReport) -> String {
        let mut parts = vec![
            format!("{} added", report.added.len()),
            format!("{} removed", report.removed.len()),
        ];
        if report.skipped > 0 {
            parts.push(self.yellow(&format!("{} skipped", report.skipped)));
        }
        for failure in &report.failures {
            parts.push(self.red(&format!("{} unavailable", failure.kind)));
        }
        parts.join(", ")
    }

    /// Formats applied count changes.
    pub fn format_changes(&self, changes: &[CountChange]) -> String {
        changes
            .iter()
            .map(|c| {
                format!(
                    "{}: {} → {}",
                    self.bold(c.entity_id.as_str()),
                    c.previous,
                    self.color_for_count(c.count)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats the effective configuration. The API key is masked.
    pub fn format_config(&self, config: &PantryConfig) -> String {
        let api_key = if config.api_key().is_some() {
            "********"
        } else {
            "(none)"
        };
        let barcode_mode = match config.barcode_mode {
            pantry_store::BarcodeMode::Local => "local",
            pantry_store::BarcodeMode::Remote => "remote",
        };

        [
            self.bold("Pantry Tracker Configuration"),
            "─".repeat(40),
            format!("Service:         {}", config.base_url()),
            format!("API key:         {api_key}"),
            format!("Update interval: {}s", config.update_interval),
            format!("Request timeout: {}s", config.request_timeout),
            format!("Barcode mode:    {barcode_mode}"),
            format!("Schema version:  {}", config.version),
        ]
        .join("\n")
    }

    /// Formats the watch-mode header.
    pub fn format_header(&self, source: &str, refreshed: Option<DateTime<Utc>>) -> String {
        let refreshed = refreshed.map_or_else(
            || "never".to_string(),
            |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
        );
        format!(
            "{} {} {}",
            self.bold("Pantry Tracker"),
            source,
            self.dim(&format!("(refreshed {refreshed})"))
        )
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_count(&self, count: i64) -> String {
        let text = format!("{count:>4}");
        match count {
            ..=0 => self.red(&text),
            1 => self.yellow(&text),
            _ => self.green(&text),
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
