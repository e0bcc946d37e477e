//! In-memory exchange for paper sessions and tests. Orders live in a local
//! book and execute against prices pushed with `on_price`.

use super::{Balance, Exchange, RemotePosition, Result};
use crate::core::error::ExchangeError;
use crate::core::snapshot::OrderSnapshot;
use crate::core::types::{Currency, Params, Side, Symbol, Timestamp};
use log::debug;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

type InternalID = u64;

#[derive(Debug, Clone)]
pub struct SimExchangeConfig {
    pub quote_currency: Currency,
    pub initial_cash: f64,
    /// Limit orders need the price to trade through, not just touch.
    pub strict_execution: bool,
}

impl Default for SimExchangeConfig {
    fn default() -> Self {
        Self {
            quote_currency: "USD".to_string(),
            initial_cash: 10_000.0,
            strict_execution: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SimOrderKind {
    Market,
    Limit(f64),
    Stop(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SimOrderStatus {
    Open,
    Closed,
    Canceled,
}

impl SimOrderStatus {
    fn as_str(&self) -> &'static str {
        match self {
            SimOrderStatus::Open => "open",
            SimOrderStatus::Closed => "closed",
            SimOrderStatus::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone)]
struct SimOrder {
    id: InternalID,
    symbol: Symbol,
    side: Side,
    order_type: String,
    kind: SimOrderKind,
    amount: f64,
    status: SimOrderStatus,
    created: Option<Timestamp>,
    trades: Vec<Value>,
}

#[derive(Debug, Default)]
struct SimState {
    last_order_id: InternalID,
    last_ts: Timestamp,
    orders: BTreeMap<InternalID, SimOrder>,
    last_prices: HashMap<Symbol, f64>,
    positions: HashMap<Symbol, f64>,
    cash: f64,
}

#[derive(Debug)]
pub struct SimExchange {
    config: SimExchangeConfig,
    state: RefCell<SimState>,
}

impl SimExchange {
    pub fn new(config: SimExchangeConfig) -> Self {
        let state = SimState {
            cash: config.initial_cash,
            ..Default::default()
        };
        Self {
            config,
            state: RefCell::new(state),
        }
    }

    /// New market price for `symbol`; executes every open order it crosses.
    pub fn on_price(&self, symbol: &str, price: f64, ts: Timestamp) {
        let mut state = self.state.borrow_mut();
        state.last_ts = ts;
        state.last_prices.insert(symbol.to_string(), price);

        let order_ids: Vec<InternalID> = state
            .orders
            .values()
            .filter(|o| o.status == SimOrderStatus::Open && o.symbol == symbol)
            .map(|o| o.id)
            .collect();

        for order_id in order_ids {
            let kind = state.orders[&order_id].kind;
            let side = state.orders[&order_id].side;
            if let Some(fill_price) = self.execution_price(kind, side, price) {
                Self::fill(&mut state, order_id, fill_price);
            }
        }
    }

    fn execution_price(&self, kind: SimOrderKind, side: Side, last: f64) -> Option<f64> {
        let crossed = |limit: f64| match side {
            Side::BUY if self.config.strict_execution => last < limit,
            Side::BUY => last <= limit,
            Side::SELL if self.config.strict_execution => last > limit,
            Side::SELL => last >= limit,
        };
        match kind {
            SimOrderKind::Market => Some(last),
            SimOrderKind::Limit(limit) => crossed(limit).then(|| limit),
            SimOrderKind::Stop(stop) => {
                let triggered = match side {
                    Side::BUY => last >= stop,
                    Side::SELL => last <= stop,
                };
                triggered.then(|| last)
            }
        }
    }

    fn fill(state: &mut SimState, order_id: InternalID, price: f64) {
        let ts = state.last_ts;
        let (symbol, signed_amount) = {
            let order = match state.orders.get_mut(&order_id) {
                Some(order) => order,
                None => return,
            };
            let fill_id = format!("{}-{}", order.id, order.trades.len() + 1);
            order.trades.push(json!({
                "id": fill_id,
                "order": order.id.to_string(),
                "timestamp": ts,
                "amount": order.amount,
                "price": price,
            }));
            order.status = SimOrderStatus::Closed;
            debug!("sim fill order {}: {} @ {}", order.id, order.amount, price);
            (order.symbol.clone(), order.side.sign() * order.amount)
        };

        state.cash -= signed_amount * price;
        *state.positions.entry(symbol).or_default() += signed_amount;
    }

    fn snapshot(order: &SimOrder) -> OrderSnapshot {
        let price = match order.kind {
            SimOrderKind::Market => Value::Null,
            SimOrderKind::Limit(price) | SimOrderKind::Stop(price) => json!(price),
        };
        let filled: f64 = order
            .trades
            .iter()
            .filter_map(|t| t.get("amount").and_then(Value::as_f64))
            .sum();
        let value = json!({
            "id": order.id.to_string(),
            "symbol": order.symbol,
            "side": order.side.as_str(),
            "type": order.order_type,
            "amount": order.amount,
            "price": price,
            "status": order.status.as_str(),
            "filled": filled,
            "remaining": order.amount - filled,
            "created": order.created,
            "trades": order.trades,
        });
        OrderSnapshot::from_value(value).unwrap_or_default()
    }

    fn parse_id(id: &str) -> Result<InternalID> {
        id.parse::<InternalID>()
            .map_err(|_| ExchangeError::OrderNotFound(id.to_string()))
    }

    fn equity(&self, state: &SimState) -> f64 {
        let holdings: f64 = state
            .positions
            .iter()
            .map(|(symbol, amount)| {
                amount * state.last_prices.get(symbol).copied().unwrap_or(0.0)
            })
            .sum();
        state.cash + holdings
    }
}

impl Exchange for SimExchange {
    fn create_order(
        &self,
        symbol: &str,
        order_type: &str,
        side: Side,
        amount: f64,
        price: Option<f64>,
        params: &Params,
    ) -> Result<OrderSnapshot> {
        if amount <= 0.0 {
            return Err(ExchangeError::InvalidOrder(format!(
                "amount must be positive: {}",
                amount
            )));
        }
        let kind = match (order_type, price) {
            ("market", _) => SimOrderKind::Market,
            ("limit", Some(price)) => SimOrderKind::Limit(price),
            ("stop", Some(price)) => SimOrderKind::Stop(price),
            ("limit", None) | ("stop", None) => {
                return Err(ExchangeError::InvalidOrder(format!(
                    "{} order requires a price",
                    order_type
                )))
            }
            (other, _) => {
                return Err(ExchangeError::NotSupported(format!(
                    "order type {}",
                    other
                )))
            }
        };

        let mut state = self.state.borrow_mut();
        let last_price = state.last_prices.get(symbol).copied();
        if kind == SimOrderKind::Market && last_price.is_none() {
            return Err(ExchangeError::InvalidOrder(format!(
                "no market price for {}",
                symbol
            )));
        }

        state.last_order_id += 1;
        let order = SimOrder {
            id: state.last_order_id,
            symbol: symbol.to_string(),
            side,
            order_type: order_type.to_string(),
            kind,
            amount,
            status: SimOrderStatus::Open,
            created: params.get("created").and_then(Value::as_u64),
            trades: vec![],
        };
        let order_id = order.id;
        debug!("sim insert open order: {:?}", &order);
        state.orders.insert(order_id, order);

        if let Some(last) = last_price {
            if let Some(fill_price) = self.execution_price(kind, side, last) {
                Self::fill(&mut state, order_id, fill_price);
            }
        }

        // creation responses carry no trades, like most venues
        let mut snapshot = Self::snapshot(&state.orders[&order_id]);
        snapshot.insert("trades", Value::Null);
        Ok(snapshot)
    }

    fn fetch_order(&self, id: &str, _symbol: &str, _params: &Params) -> Result<OrderSnapshot> {
        let order_id = Self::parse_id(id)?;
        let state = self.state.borrow();
        match state.orders.get(&order_id) {
            Some(order) => Ok(Self::snapshot(order)),
            None => Err(ExchangeError::OrderNotFound(id.to_string())),
        }
    }

    fn cancel_order(&self, id: &str, _symbol: &str, _params: &Params) -> Result<OrderSnapshot> {
        let order_id = Self::parse_id(id)?;
        let mut state = self.state.borrow_mut();
        let order = match state.orders.get_mut(&order_id) {
            Some(order) => order,
            None => return Err(ExchangeError::OrderNotFound(id.to_string())),
        };
        if order.status != SimOrderStatus::Open {
            return Err(ExchangeError::InvalidOrder(format!(
                "order {} is {}",
                id,
                order.status.as_str()
            )));
        }
        order.status = SimOrderStatus::Canceled;
        debug!("sim cancel order {}", id);
        Ok(Self::snapshot(order))
    }

    fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>> {
        let state = self.state.borrow();
        Ok(state
            .orders
            .values()
            .filter(|o| o.status == SimOrderStatus::Open)
            .filter(|o| symbol.map(|s| s == o.symbol).unwrap_or(true))
            .map(Self::snapshot)
            .collect())
    }

    fn fetch_balance(&self) -> Result<Balance> {
        let state = self.state.borrow();
        let currency = self.config.quote_currency.clone();
        Ok(Balance {
            free: HashMap::from([(currency.clone(), state.cash)]),
            total: HashMap::from([(currency, self.equity(&state))]),
        })
    }

    fn fetch_wallet_balance(&self, currency: &str, _params: &Params) -> Result<Balance> {
        if currency == self.config.quote_currency {
            return self.fetch_balance();
        }
        let state = self.state.borrow();
        // base asset holdings, e.g. BTC out of BTC/USD
        let held: f64 = state
            .positions
            .iter()
            .filter(|(symbol, _)| symbol.split('/').next() == Some(currency))
            .map(|(_, amount)| *amount)
            .sum();
        Ok(Balance {
            free: HashMap::from([(currency.to_string(), held)]),
            total: HashMap::from([(currency.to_string(), held)]),
        })
    }

    fn fetch_positions(&self) -> Result<Vec<RemotePosition>> {
        let state = self.state.borrow();
        let mut positions: Vec<RemotePosition> = state
            .positions
            .iter()
            .filter(|(_, amount)| **amount != 0.0)
            .map(|(symbol, amount)| RemotePosition {
                symbol: symbol.clone(),
                position_amt: *amount,
                entry_price: None,
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }

    fn call_private_endpoint(
        &self,
        _method: &str,
        implicit_name: &str,
        _params: &Params,
    ) -> Result<Value> {
        Err(ExchangeError::NotSupported(implicit_name.to_string()))
    }
}
