use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Symbol = String;
pub type OrderId = String;
pub type FillId = String;
pub type OwnerId = String;
pub type Currency = String;
/// Milliseconds since epoch, engine clock.
pub type Timestamp = u64;
/// Free-form exchange parameters, forwarded untouched to the collaborator.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum OrderType {
    MARKET,
    LIMIT,
    STOP,
    STOP_LIMIT,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    BUY,
    SELL,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::BUY => "buy",
            Side::SELL => "sell",
        }
    }

    /// Anything that is not "sell" is read as a buy.
    pub fn from_exchange(side: &str) -> Self {
        if side.eq_ignore_ascii_case("sell") {
            Side::SELL
        } else {
            Side::BUY
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            Side::BUY => 1.0,
            Side::SELL => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum OrderStatus {
    SUBMITTED,
    ACCEPTED,
    PARTIALLY_FILLED,
    COMPLETED,
    CANCELED,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::COMPLETED | OrderStatus::CANCELED)
    }
}
