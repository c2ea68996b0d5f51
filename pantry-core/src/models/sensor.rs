//! Local projections of remote pantry state.
//!
//! A [`Projection`] is either the single categories aggregate or one product
//! sensor. Code that needs to treat the two differently matches on the
//! variant instead of probing for fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::identity::EntityId;
use super::product::{Attributes, ProductRecord, barcode_of};

/// Icon shown for product sensors.
pub const PRODUCT_ICON: &str = "mdi:barcode-scan";

/// Icon shown for the categories aggregate.
pub const CATEGORIES_ICON: &str = "mdi:format-list-bulleted";

/// Display name of the categories aggregate.
pub const CATEGORIES_NAME: &str = "Pantry Categories";

// ============================================================================
// Categories Aggregate
// ============================================================================

/// Aggregate projection of the remote category list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoriesSensor {
    categories: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl CategoriesSensor {
    /// Creates the aggregate from an initial category list.
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            updated_at: None,
        }
    }

    /// Replaces the category list.
    pub fn update_categories(&mut self, categories: Vec<String>) {
        self.categories = categories;
        self.updated_at = Some(Utc::now());
    }

    /// Number of categories, the numeric state of the aggregate.
    pub fn native_value(&self) -> usize {
        self.categories.len()
    }

    /// The full category list.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// When the list was last replaced.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Host-visible attributes.
    pub fn extra_state_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert(
            "categories".to_string(),
            Value::from(self.categories.clone()),
        );
        attrs
    }
}

// ============================================================================
// Product Sensor
// ============================================================================

/// Projection of a single remote product.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSensor {
    entity_id: EntityId,
    product_name: String,
    url: String,
    category: String,
    count: i64,
    attributes: Attributes,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductSensor {
    /// Creates a sensor from a freshly observed record and its initial count.
    pub fn new(record: ProductRecord, initial_count: i64) -> Self {
        let now = Utc::now();
        Self {
            entity_id: record.entity_id(),
            product_name: record.name,
            url: record.url,
            category: record.category,
            count: initial_count,
            attributes: record.attributes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a later observation of the same product.
    ///
    /// URL and category are always replaced. Additional attributes are only
    /// replaced when the new set is non-empty so a degraded record cannot
    /// wipe what is already known.
    pub fn update_attributes(&mut self, url: String, category: String, attributes: Attributes) {
        self.url = url;
        self.category = category;
        if !attributes.is_empty() {
            self.attributes = attributes;
        }
        self.updated_at = Utc::now();
    }

    /// Sets the stock count.
    pub fn update_count(&mut self, count: i64) {
        self.count = count;
        self.updated_at = Utc::now();
    }

    /// Identity of this sensor.
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    /// Product name as reported by the remote service.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Display name.
    pub fn display_name(&self) -> String {
        format!("Product: {}", self.product_name)
    }

    /// Product URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Category label.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Current stock count, the numeric state of the sensor.
    pub fn count(&self) -> i64 {
        self.count
    }

    /// Passthrough attributes.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Barcode attribute rendered as text, if any.
    pub fn barcode(&self) -> Option<String> {
        barcode_of(&self.attributes)
    }

    /// When the sensor was first created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the sensor last changed.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Host-visible attributes; passthrough attributes are merged last.
    pub fn extra_state_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("product_name".into(), Value::from(self.product_name.clone()));
        attrs.insert("url".into(), Value::from(self.url.clone()));
        attrs.insert("category".into(), Value::from(self.category.clone()));
        attrs.insert("count".into(), Value::from(self.count));
        for (key, value) in &self.attributes {
            attrs.insert(key.clone(), value.clone());
        }
        attrs
    }
}

// ============================================================================
// Projection
// ============================================================================

/// A host-visible projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// The categories aggregate.
    Categories(CategoriesSensor),
    /// A single product.
    Product(ProductSensor),
}

impl Projection {
    /// Returns the product sensor, if this is one.
    pub fn as_product(&self) -> Option<&ProductSensor> {
        match self {
            Self::Product(sensor) => Some(sensor),
            Self::Categories(_) => None,
        }
    }

    /// Returns the product sensor mutably, if this is one.
    pub fn as_product_mut(&mut self) -> Option<&mut ProductSensor> {
        match self {
            Self::Product(sensor) => Some(sensor),
            Self::Categories(_) => None,
        }
    }

    /// Builds the serialisable host view of this projection.
    pub fn state(&self) -> SensorState {
        match self {
            Self::Categories(sensor) => {
                let id = EntityId::categories();
                SensorState {
                    unique_id: id.unique_id(),
                    entity_id: id,
                    name: CATEGORIES_NAME.to_string(),
                    icon: CATEGORIES_ICON.to_string(),
                    state: i64::try_from(sensor.native_value()).unwrap_or(i64::MAX),
                    attributes: sensor.extra_state_attributes(),
                }
            }
            Self::Product(sensor) => SensorState {
                entity_id: sensor.entity_id.clone(),
                unique_id: sensor.entity_id.unique_id(),
                name: sensor.display_name(),
                icon: PRODUCT_ICON.to_string(),
                state: sensor.count,
                attributes: sensor.extra_state_attributes(),
            },
        }
    }
}

/// Serialisable snapshot of a projection as the host sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    /// Entity identity.
    pub entity_id: EntityId,
    /// Registry unique id.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    /// Icon name.
    pub icon: String,
    /// Numeric state.
    pub state: i64,
    /// Attributes.
    pub attributes: Map<String, Value>,
}
