//! Remote product records.
//!
//! The products endpoint returns loosely shaped objects. Only `name` is
//! required; `url` and `category` default to empty strings and every other
//! key is carried through as an additional attribute.

use serde_json::{Map, Value};

use super::identity::EntityId;
use crate::error::CoreError;

/// Additional attributes carried by a product (e.g. `barcode`).
pub type Attributes = Map<String, Value>;

/// A product as reported by the remote pantry service.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    /// Product name (required).
    pub name: String,
    /// Product URL, empty when absent.
    pub url: String,
    /// Category label, empty when absent.
    pub category: String,
    /// Passthrough attributes that are not `name`, `url` or `category`.
    pub attributes: Attributes,
}

impl ProductRecord {
    /// Creates a record with no URL, category or extra attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: String::new(),
            category: String::new(),
            attributes: Attributes::new(),
        }
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Adds an additional attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Parses a record from a raw JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or has no string `name`.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let Value::Object(object) = value else {
            return Err(CoreError::InvalidData(format!(
                "product record is not an object: {value}"
            )));
        };

        let mut attributes = object.clone();
        let name = match attributes.remove("name") {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(CoreError::InvalidData(format!(
                    "product name is not a string: {other}"
                )));
            }
            None => {
                return Err(CoreError::MissingField {
                    field: "name",
                    context: value.to_string(),
                });
            }
        };
        let url = attributes.remove("url").map(text_of).unwrap_or_default();
        let category = attributes.remove("category").map(text_of).unwrap_or_default();

        Ok(Self {
            name,
            url,
            category,
            attributes,
        })
    }

    /// Returns the identity this record projects to.
    pub fn entity_id(&self) -> EntityId {
        EntityId::from_product_name(&self.name)
    }

    /// Returns the barcode attribute rendered as text, if any.
    pub fn barcode(&self) -> Option<String> {
        barcode_of(&self.attributes)
    }
}

/// Returns the `barcode` attribute rendered as text, if present.
///
/// Barcodes arrive either as strings or as bare JSON numbers.
pub fn barcode_of(attributes: &Attributes) -> Option<String> {
    match attributes.get("barcode")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

/// Renders a loosely typed JSON value as text. `null` becomes empty.
pub fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_record() {
        let raw = json!({
            "name": "Milk",
            "url": "https://shop.example/milk",
            "category": "Dairy",
            "barcode": "012345",
            "unit": "l"
        });
        let record = ProductRecord::from_value(&raw).unwrap();

        assert_eq!(record.name, "Milk");
        assert_eq!(record.url, "https://shop.example/milk");
        assert_eq!(record.category, "Dairy");
        assert_eq!(record.attributes.len(), 2);
        assert_eq!(record.barcode().as_deref(), Some("012345"));
        assert_eq!(record.entity_id().as_str(), "sensor.product_milk");
    }

    #[test]
    fn test_defaults_for_missing_optional_fields() {
        let record = ProductRecord::from_value(&json!({"name": "Milk"})).unwrap();
        assert_eq!(record.url, "");
        assert_eq!(record.category, "");
        assert!(record.attributes.is_empty());
    }

    #[test]
    fn test_null_url_becomes_empty() {
        let record = ProductRecord::from_value(&json!({"name": "Milk", "url": null})).unwrap();
        assert_eq!(record.url, "");
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let err = ProductRecord::from_value(&json!({"url": "x"})).unwrap_err();
        assert!(matches!(err, CoreError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(ProductRecord::from_value(&json!("Milk")).is_err());
        assert!(ProductRecord::from_value(&json!({"name": 7})).is_err());
    }

    #[test]
    fn test_numeric_barcode() {
        let record = ProductRecord::new("Rice").with_attribute("barcode", 4_006_381);
        assert_eq!(record.barcode().as_deref(), Some("4006381"));
    }
}
