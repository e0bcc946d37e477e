use crate::core::types::{FillId, OrderId, Side, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw exchange-side order representation. Only `id`, `symbol`, `side`,
/// `amount`, `price` and `trades` are read directly; every other field is
/// reached through the mapping table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderSnapshot(Map<String, Value>);

/// Single execution reported inside a snapshot's `trades` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub id: FillId,
    pub timestamp: Option<Timestamp>,
    pub amount: f64,
    pub price: f64,
}

impl OrderSnapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Only JSON objects are snapshots.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn id(&self) -> Option<OrderId> {
        self.field("id").and_then(value_as_string)
    }

    pub fn symbol(&self) -> Option<String> {
        self.field("symbol").and_then(value_as_string)
    }

    pub fn side(&self) -> Option<Side> {
        self.field("side")
            .and_then(Value::as_str)
            .map(Side::from_exchange)
    }

    pub fn amount(&self) -> Option<f64> {
        self.field("amount").and_then(value_as_f64)
    }

    pub fn price(&self) -> Option<f64> {
        self.field("price").and_then(value_as_f64)
    }

    /// `Ok(None)` when the snapshot carries no trade list (absent or null).
    pub fn trades(&self) -> Result<Option<Vec<Fill>>, String> {
        let trades = match self.field("trades") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Array(trades)) => trades,
            Some(other) => return Err(format!("trades is not a list: {}", other)),
        };

        let mut fills = Vec::with_capacity(trades.len());
        for (idx, trade) in trades.iter().enumerate() {
            let id = trade
                .get("id")
                .and_then(value_as_string)
                .ok_or_else(|| format!("trade #{} has no id", idx))?;
            let amount = trade
                .get("amount")
                .and_then(value_as_f64)
                .ok_or_else(|| format!("trade {} has no amount", id))?;
            let price = trade
                .get("price")
                .and_then(value_as_f64)
                .ok_or_else(|| format!("trade {} has no price", id))?;
            let timestamp = trade.get("timestamp").and_then(Value::as_u64);
            fills.push(Fill {
                id,
                timestamp,
                amount,
                price,
            });
        }
        Ok(Some(fills))
    }
}

impl From<Map<String, Value>> for OrderSnapshot {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// exchanges often send decimals as strings
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}
