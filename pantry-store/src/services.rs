//! Host-invokable count services.
//!
//! The host dispatches services by name with loosely typed data; this module
//! turns that into a typed [`ServiceCall`].

use pantry_core::{CountAction, EntityId};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::StoreError;

/// `increase_count` service name.
pub const INCREASE_COUNT: &str = "increase_count";
/// `decrease_count` service name.
pub const DECREASE_COUNT: &str = "decrease_count";
/// `increase_count_by_barcode` service name.
pub const INCREASE_COUNT_BY_BARCODE: &str = "increase_count_by_barcode";
/// `decrease_count_by_barcode` service name.
pub const DECREASE_COUNT_BY_BARCODE: &str = "decrease_count_by_barcode";

/// All service names, in registration order.
pub const SERVICE_NAMES: [&str; 4] = [
    INCREASE_COUNT,
    DECREASE_COUNT,
    INCREASE_COUNT_BY_BARCODE,
    DECREASE_COUNT_BY_BARCODE,
];

/// Amount used when a call does not specify one.
pub const DEFAULT_AMOUNT: i64 = 1;

/// How a service call addresses its products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceTarget {
    /// One projection by identity.
    Entity(EntityId),
    /// Every projection carrying this barcode.
    Barcode(String),
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity {id}"),
            Self::Barcode(code) => write!(f, "barcode {code}"),
        }
    }
}

/// A parsed service invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCall {
    /// Direction of the change.
    pub action: CountAction,
    /// Products addressed.
    pub target: ServiceTarget,
    /// Amount to apply.
    pub amount: i64,
}

impl ServiceCall {
    /// Creates a by-identity call.
    pub fn by_entity(action: CountAction, entity_id: impl Into<EntityId>, amount: i64) -> Self {
        Self {
            action,
            target: ServiceTarget::Entity(entity_id.into()),
            amount,
        }
    }

    /// Creates a by-barcode call.
    pub fn by_barcode(action: CountAction, barcode: impl Into<String>, amount: i64) -> Self {
        Self {
            action,
            target: ServiceTarget::Barcode(barcode.into()),
            amount,
        }
    }

    /// Parses a host service invocation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidServiceCall`] for an unknown service, a
    /// missing or mistyped target, or an amount that is not an integer.
    pub fn from_data(service: &str, data: &Value) -> Result<Self, StoreError> {
        let (action, by_barcode) = match service {
            INCREASE_COUNT => (CountAction::Increase, false),
            DECREASE_COUNT => (CountAction::Decrease, false),
            INCREASE_COUNT_BY_BARCODE => (CountAction::Increase, true),
            DECREASE_COUNT_BY_BARCODE => (CountAction::Decrease, true),
            other => {
                return Err(StoreError::InvalidServiceCall(format!(
                    "unknown service '{other}'"
                )));
            }
        };

        let amount = coerce_amount(data.get("amount"))?;
        let target = if by_barcode {
            let barcode = match data.get("barcode") {
                Some(Value::String(code)) if !code.is_empty() => code.clone(),
                Some(Value::Number(code)) => code.to_string(),
                _ => {
                    return Err(StoreError::InvalidServiceCall(format!(
                        "{service} requires a 'barcode'"
                    )));
                }
            };
            ServiceTarget::Barcode(barcode)
        } else {
            match data.get("entity_id").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => ServiceTarget::Entity(EntityId::new(id)),
                _ => {
                    return Err(StoreError::InvalidServiceCall(format!(
                        "{service} requires an 'entity_id'"
                    )));
                }
            }
        };

        Ok(Self {
            action,
            target,
            amount,
        })
    }

    /// Host service name of this call.
    pub fn service_name(&self) -> &'static str {
        match (&self.target, self.action) {
            (ServiceTarget::Entity(_), CountAction::Increase) => INCREASE_COUNT,
            (ServiceTarget::Entity(_), CountAction::Decrease) => DECREASE_COUNT,
            (ServiceTarget::Barcode(_), CountAction::Increase) => INCREASE_COUNT_BY_BARCODE,
            (ServiceTarget::Barcode(_), CountAction::Decrease) => DECREASE_COUNT_BY_BARCODE,
        }
    }
}

/// Coerces the `amount` field to an integer. Absent or null means 1.
fn coerce_amount(value: Option<&Value>) -> Result<i64, StoreError> {
    let invalid = |v: &Value| StoreError::InvalidServiceCall(format!("invalid amount: {v}"));
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_AMOUNT),
        Some(v @ Value::Number(n)) => {
            if let Some(int) = n.as_i64() {
                return Ok(int);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < 9.0e15 => Ok(truncate(f)),
                _ => Err(invalid(v)),
            }
        }
        Some(v @ Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid(v)),
        Some(other) => Err(invalid(other)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}

// ============================================================================
// Count Change
// ============================================================================

/// A count change applied to one projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountChange {
    /// Projection that changed.
    pub entity_id: EntityId,
    /// Count before the change.
    pub previous: i64,
    /// Count after the change.
    pub count: i64,
}
