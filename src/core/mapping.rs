//! Per-exchange vocabulary: how engine order types are spelled on the
//! exchange and which snapshot field/value pairs mean "closed", "canceled"
//! and, optionally, "open".

use crate::core::snapshot::{value_as_f64, OrderSnapshot};
use crate::core::types::OrderType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const DEFAULT_ORDER_TYPE: &str = "market";

/// Flat `field == value` predicate over a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRule {
    pub key: String,
    pub value: Value,
}

impl StatusRule {
    pub fn new<V: Into<Value>>(key: &str, value: V) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// A missing field never matches.
    pub fn matches(&self, snapshot: &OrderSnapshot) -> bool {
        match snapshot.field(&self.key) {
            Some(actual) => values_equal(actual, &self.value),
            None => false,
        }
    }
}

// 1 and 1.0 are the same status code
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), Value::Number(_)) => value_as_f64(actual) == value_as_f64(expected),
        _ => actual == expected,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingTable {
    pub order_types: HashMap<OrderType, String>,
    pub closed_order: StatusRule,
    pub canceled_order: StatusRule,
    pub open_order: Option<StatusRule>,
}

impl Default for MappingTable {
    fn default() -> Self {
        let order_types = HashMap::from([
            (OrderType::MARKET, "market".to_string()),
            (OrderType::LIMIT, "limit".to_string()),
            // "stop-loss" on kraken
            (OrderType::STOP, "stop".to_string()),
            (OrderType::STOP_LIMIT, "stop limit".to_string()),
        ]);

        Self {
            order_types,
            closed_order: StatusRule::new("status", "closed"),
            canceled_order: StatusRule::new("status", "canceled"),
            open_order: None,
        }
    }
}

impl MappingTable {
    pub fn order_type(&self, order_type: Option<OrderType>) -> &str {
        order_type
            .and_then(|t| self.order_types.get(&t))
            .map(String::as_str)
            .unwrap_or(DEFAULT_ORDER_TYPE)
    }

    pub fn is_closed(&self, snapshot: &OrderSnapshot) -> bool {
        self.closed_order.matches(snapshot)
    }

    pub fn is_canceled(&self, snapshot: &OrderSnapshot) -> bool {
        self.canceled_order.matches(snapshot)
    }

    /// False when no open rule is configured.
    pub fn is_open(&self, snapshot: &OrderSnapshot) -> bool {
        self.open_order
            .as_ref()
            .map(|rule| rule.matches(snapshot))
            .unwrap_or(false)
    }
}
