#![allow(dead_code)]

use exbroker::core::broker::Broker;
use exbroker::core::error::ExchangeError;
use exbroker::core::order::BrokerOrder;
use exbroker::core::snapshot::OrderSnapshot;
use exbroker::core::types::{Params, Side};
use exbroker::exchange::{Balance, Exchange, RemotePosition, Result};
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

pub const CURRENCY: &str = "USD";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calls {
    pub create: usize,
    pub fetch: usize,
    pub cancel: usize,
    pub open_orders: usize,
    pub balance: usize,
    pub wallet_balance: usize,
    pub positions: usize,
    pub private: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateCall {
    pub symbol: String,
    pub order_type: String,
    pub side: Side,
    pub amount: f64,
    pub price: Option<f64>,
    pub params: Params,
}

/// Exchange whose order snapshots are scripted by the test.
#[derive(Debug, Default)]
pub struct FakeExchange {
    orders: RefCell<HashMap<String, Map<String, Value>>>,
    positions: RefCell<Vec<RemotePosition>>,
    balance: RefCell<Balance>,
    failing: RefCell<HashSet<String>>,
    calls: RefCell<Calls>,
    creates: RefCell<Vec<CreateCall>>,
    private_calls: RefCell<Vec<(String, String)>>,
    creation_price: RefCell<Option<Value>>,
    last_id: Cell<u64>,
}

impl FakeExchange {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.set_balance(1000.0, 1000.0);
        fake
    }

    pub fn calls(&self) -> Calls {
        self.calls.borrow().clone()
    }

    pub fn creates(&self) -> Vec<CreateCall> {
        self.creates.borrow().clone()
    }

    pub fn private_calls(&self) -> Vec<(String, String)> {
        self.private_calls.borrow().clone()
    }

    pub fn set_balance(&self, free: f64, total: f64) {
        *self.balance.borrow_mut() = Balance {
            free: HashMap::from([(CURRENCY.to_string(), free)]),
            total: HashMap::from([(CURRENCY.to_string(), total)]),
        };
    }

    pub fn set_positions(&self, positions: &[(&str, f64)]) {
        *self.positions.borrow_mut() = positions
            .iter()
            .map(|(symbol, amount)| RemotePosition {
                symbol: symbol.to_string(),
                position_amt: *amount,
                entry_price: None,
            })
            .collect();
    }

    /// Inserts or replaces the remote state of an order.
    pub fn set_order(&self, id: &str, value: Value) {
        let fields = value.as_object().cloned().unwrap_or_default();
        self.orders.borrow_mut().insert(id.to_string(), fields);
    }

    pub fn set_field(&self, id: &str, key: &str, value: Value) {
        if let Some(order) = self.orders.borrow_mut().get_mut(id) {
            order.insert(key.to_string(), value);
        }
    }

    pub fn fill(&self, id: &str, fills: Value) {
        self.set_field(id, "trades", fills);
    }

    pub fn close(&self, id: &str) {
        self.set_field(id, "status", json!("closed"));
    }

    /// Price echoed in creation responses instead of the requested one.
    pub fn set_creation_price(&self, price: Value) {
        *self.creation_price.borrow_mut() = Some(price);
    }

    pub fn fail_fetch(&self, id: &str) {
        self.failing.borrow_mut().insert(id.to_string());
    }
}

impl Exchange for FakeExchange {
    fn create_order(
        &self,
        symbol: &str,
        order_type: &str,
        side: Side,
        amount: f64,
        price: Option<f64>,
        params: &Params,
    ) -> Result<OrderSnapshot> {
        self.calls.borrow_mut().create += 1;
        self.creates.borrow_mut().push(CreateCall {
            symbol: symbol.to_string(),
            order_type: order_type.to_string(),
            side,
            amount,
            price,
            params: params.clone(),
        });

        self.last_id.set(self.last_id.get() + 1);
        let id = format!("o{}", self.last_id.get());
        self.set_order(
            &id,
            json!({
                "id": id,
                "symbol": symbol,
                "side": side.as_str(),
                "type": order_type,
                "amount": amount,
                "price": price,
                "status": "open",
                "trades": null,
            }),
        );

        // partial creation response
        let echoed = self
            .creation_price
            .borrow()
            .clone()
            .unwrap_or_else(|| json!(price));
        Ok(OrderSnapshot::from_value(json!({"id": id, "price": echoed})).unwrap())
    }

    fn fetch_order(&self, id: &str, _symbol: &str, _params: &Params) -> Result<OrderSnapshot> {
        self.calls.borrow_mut().fetch += 1;
        if self.failing.borrow().contains(id) {
            return Err(ExchangeError::Network(format!("timeout fetching {}", id)));
        }
        match self.orders.borrow().get(id) {
            Some(fields) => Ok(OrderSnapshot::new(fields.clone())),
            None => Err(ExchangeError::OrderNotFound(id.to_string())),
        }
    }

    fn cancel_order(&self, id: &str, _symbol: &str, _params: &Params) -> Result<OrderSnapshot> {
        self.calls.borrow_mut().cancel += 1;
        self.set_field(id, "status", json!("canceled"));
        match self.orders.borrow().get(id) {
            Some(fields) => Ok(OrderSnapshot::new(fields.clone())),
            None => Err(ExchangeError::OrderNotFound(id.to_string())),
        }
    }

    fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>> {
        self.calls.borrow_mut().open_orders += 1;
        let mut orders: Vec<OrderSnapshot> = self
            .orders
            .borrow()
            .values()
            .filter(|o| o.get("status") == Some(&json!("open")))
            .filter(|o| {
                symbol
                    .map(|s| o.get("symbol") == Some(&json!(s)))
                    .unwrap_or(true)
            })
            .map(|o| OrderSnapshot::new(o.clone()))
            .collect();
        orders.sort_by_key(|o| o.id());
        Ok(orders)
    }

    fn fetch_balance(&self) -> Result<Balance> {
        self.calls.borrow_mut().balance += 1;
        Ok(self.balance.borrow().clone())
    }

    fn fetch_wallet_balance(&self, currency: &str, _params: &Params) -> Result<Balance> {
        self.calls.borrow_mut().wallet_balance += 1;
        Ok(Balance {
            free: HashMap::from([(currency.to_string(), 0.25)]),
            total: HashMap::from([(currency.to_string(), 0.5)]),
        })
    }

    fn fetch_positions(&self) -> Result<Vec<RemotePosition>> {
        self.calls.borrow_mut().positions += 1;
        Ok(self.positions.borrow().clone())
    }

    fn call_private_endpoint(
        &self,
        method: &str,
        implicit_name: &str,
        _params: &Params,
    ) -> Result<Value> {
        self.calls.borrow_mut().private += 1;
        self.private_calls
            .borrow_mut()
            .push((method.to_string(), implicit_name.to_string()));
        Ok(json!({"result": "ok"}))
    }
}

pub fn drain<E: Exchange>(broker: &Broker<E>) -> Vec<BrokerOrder> {
    let mut notifications = vec![];
    while let Some(order) = broker.get_notification() {
        notifications.push(order);
    }
    notifications
}
