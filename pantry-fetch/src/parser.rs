//! Response parsers for the three read collections.
//!
//! A body of the wrong container type is an error here; the caller decides
//! to degrade it to an empty collection.

use pantry_core::{CollectionKind, CountTable, EntityId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{FetchError, json_type_name};

/// Parses the categories body: a JSON array of labels.
///
/// Non-string entries are kept as their JSON text.
pub fn parse_categories(body: Value) -> Result<Vec<String>, FetchError> {
    let Value::Array(items) = body else {
        return Err(shape_error(CollectionKind::Categories, &body));
    };
    debug!(count = items.len(), "Parsed categories");
    Ok(items.into_iter().map(pantry_core::models::product::text_of).collect())
}

/// Parses the products body: a JSON array of raw product objects.
///
/// Records are kept raw so the engine can skip malformed ones individually.
pub fn parse_products(body: Value) -> Result<Vec<Value>, FetchError> {
    let Value::Array(items) = body else {
        return Err(shape_error(CollectionKind::Products, &body));
    };
    debug!(count = items.len(), "Parsed products");
    Ok(items)
}

/// Parses the counts body: a JSON object mapping identity to integer.
///
/// Entries whose value is not an integer are skipped.
pub fn parse_counts(body: Value) -> Result<CountTable, FetchError> {
    let Value::Object(entries) = body else {
        return Err(shape_error(CollectionKind::Counts, &body));
    };

    let mut table = CountTable::with_capacity(entries.len());
    for (id, value) in entries {
        match value.as_i64() {
            Some(count) => {
                table.insert(EntityId::new(id), count);
            }
            None => warn!(entity_id = %id, value = %value, "Skipping non-integer count"),
        }
    }
    debug!(count = table.len(), "Parsed counts");
    Ok(table)
}

fn shape_error(kind: CollectionKind, body: &Value) -> FetchError {
    FetchError::UnexpectedShape {
        kind,
        expected: kind.expected_shape(),
        found: json_type_name(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_categories() {
        let parsed = parse_categories(json!(["Dairy", "Produce", 3])).unwrap();
        assert_eq!(parsed, vec!["Dairy", "Produce", "3"]);
    }

    #[test]
    fn test_categories_must_be_array() {
        let err = parse_categories(json!({"Dairy": 1})).unwrap_err();
        assert!(matches!(
            err,
            FetchError::UnexpectedShape {
                kind: CollectionKind::Categories,
                found: "object",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_products_keeps_raw_records() {
        let parsed = parse_products(json!([{"name": "Milk"}, {"url": "no-name"}])).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_products_must_be_array() {
        assert!(parse_products(json!("oops")).is_err());
        assert!(parse_products(Value::Null).is_err());
    }

    #[test]
    fn test_parse_counts() {
        let parsed = parse_counts(json!({
            "sensor.product_milk": 4,
            "sensor.product_eggs": -2,
            "sensor.product_rice": "many"
        }))
        .unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&EntityId::new("sensor.product_milk")], 4);
        assert_eq!(parsed[&EntityId::new("sensor.product_eggs")], -2);
    }

    #[test]
    fn test_counts_must_be_object() {
        let err = parse_counts(json!([1, 2])).unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape { expected: "object", .. }));
    }
}
