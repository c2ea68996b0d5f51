//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use pantry_core::{CategoriesSensor, EntityId, ProductRecord, ProductSensor, Projection, SensorState};
use pantry_store::{CountChange, PantryConfig, TickReport};

fn sensors() -> Vec<SensorState> {
    let categories =
        Projection::Categories(CategoriesSensor::new(vec!["Dairy".into(), "Produce".into()]));
    let milk = Projection::Product(ProductSensor::new(
        ProductRecord::new("Milk")
            .with_category("Dairy")
            .with_attribute("barcode", "012345"),
        3,
    ));
    let rice = Projection::Product(ProductSensor::new(ProductRecord::new("Rice"), 0));
    vec![categories.state(), milk.state(), rice.state()]
}

#[cfg(test)]
mod text_formatter_tests {
    use super::*;
    use crate::output::TextFormatter;

    #[test]
    fn test_sensor_table() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_sensors(&sensors());

        assert!(output.starts_with("Pantry Categories"));
        assert!(output.contains("Dairy, Produce"));
        assert!(output.contains("Product: Milk"));
        assert!(output.contains("   3 Dairy"));
        assert!(output.contains("Product: Rice"));
    }

    #[test]
    fn test_empty_table() {
        let formatter = TextFormatter::new(false);
        let only_categories = vec![sensors().remove(0)];
        assert!(formatter.format_sensors(&only_categories).contains("No products"));
    }

    #[test]
    fn test_changes() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_changes(&[CountChange {
            entity_id: EntityId::new("sensor.product_milk"),
            previous: 4,
            count: 0,
        }]);
        assert_eq!(output, "sensor.product_milk: 4 →    0");
    }

    #[test]
    fn test_report_summary() {
        let formatter = TextFormatter::new(false);
        let report = TickReport {
            skipped: 2,
            ..TickReport::default()
        };
        assert_eq!(formatter.format_report(&report), "0 added, 0 removed, 2 skipped");
    }

    #[test]
    fn test_config_masks_api_key() {
        let formatter = TextFormatter::new(false);
        let config = PantryConfig {
            api_key: Some("secret".into()),
            ..PantryConfig::default()
        };
        let output = formatter.format_config(&config);
        assert!(output.contains("http://homeassistant.local:8099"));
        assert!(!output.contains("secret"));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::*;
    use crate::output::{ConfigOutput, JsonFormatter};
    use pantry_core::CollectionKind;
    use pantry_fetch::CollectionFailure;
    use serde_json::Value;

    #[test]
    fn test_status_output() {
        let formatter = JsonFormatter::new(false);
        let report = TickReport {
            failures: vec![CollectionFailure {
                kind: CollectionKind::Counts,
                message: "Unexpected status 500 from /counts".into(),
            }],
            ..TickReport::default()
        };

        let json = formatter
            .format_status("http://pantry.lan:8099", None, &report, sensors())
            .unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["source"], "http://pantry.lan:8099");
        assert!(parsed.get("refreshedAt").is_none());
        assert_eq!(parsed["failures"][0]["collection"], "counts");
        assert_eq!(parsed["sensors"][0]["entity_id"], "pantry_categories");
        assert_eq!(parsed["sensors"][1]["state"], 3);
        assert_eq!(parsed["sensors"][1]["attributes"]["barcode"], "012345");
    }

    #[test]
    fn test_pretty_output() {
        let formatter = JsonFormatter::new(true);
        let json = formatter.format(&sensors()[0]).unwrap();
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_config_output_hides_key() {
        let formatter = JsonFormatter::new(false);
        let config = PantryConfig {
            api_key: Some("secret".into()),
            ..PantryConfig::default()
        };
        let output = ConfigOutput {
            path: "/tmp/config.json".into(),
            base_url: config.base_url(),
            has_api_key: true,
            config: (&config).into(),
        };

        let json = formatter.format(&output).unwrap();
        assert!(!json.contains("secret"));
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["hasApiKey"], true);
        assert_eq!(parsed["port"], 8099);
        assert_eq!(parsed["barcode_mode"], "local");
    }
}
