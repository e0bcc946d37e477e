//! Contract the broker consumes from an exchange connectivity layer.
//! Implementations own transport, auth, serialization and any retry policy.

pub mod sim;

use crate::core::error::ExchangeError;
use crate::core::snapshot::OrderSnapshot;
use crate::core::types::{Currency, Params, Side, Symbol};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub type Result<T> = std::result::Result<T, ExchangeError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub free: HashMap<Currency, f64>,
    pub total: HashMap<Currency, f64>,
}

impl Balance {
    /// (free, total) for one currency, zero when the exchange omits it.
    pub fn for_currency(&self, currency: &str) -> (f64, f64) {
        (
            self.free.get(currency).copied().unwrap_or(0.0),
            self.total.get(currency).copied().unwrap_or(0.0),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePosition {
    pub symbol: Symbol,
    /// Signed: negative when short.
    #[serde(rename = "positionAmt")]
    pub position_amt: f64,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "entryPrice")]
    pub entry_price: Option<f64>,
}

pub trait Exchange {
    fn create_order(
        &self,
        symbol: &str,
        order_type: &str,
        side: Side,
        amount: f64,
        price: Option<f64>,
        params: &Params,
    ) -> Result<OrderSnapshot>;
    fn fetch_order(&self, id: &str, symbol: &str, params: &Params) -> Result<OrderSnapshot>;
    fn cancel_order(&self, id: &str, symbol: &str, params: &Params) -> Result<OrderSnapshot>;
    fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>>;
    fn fetch_balance(&self) -> Result<Balance>;
    fn fetch_wallet_balance(&self, currency: &str, params: &Params) -> Result<Balance>;
    fn fetch_positions(&self) -> Result<Vec<RemotePosition>>;
    /// `method` is the HTTP verb, `implicit_name` the exchange-specific
    /// method name, e.g. `private_getorder_id_cancel`.
    fn call_private_endpoint(
        &self,
        method: &str,
        implicit_name: &str,
        params: &Params,
    ) -> Result<Value>;
}
