use crate::common::config::BrokerConfig;
use crate::core::error::{BrokerError, Result};
use crate::core::ledger::{Ledger, Position};
use crate::core::mapping::MappingTable;
use crate::core::notifications::NotificationQueue;
use crate::core::order::BrokerOrder;
use crate::core::reconcile::{
    find_order, reconcile_open_orders, ReconcileContext, ReconcileSummary,
};
use crate::core::snapshot::OrderSnapshot;
use crate::core::types::{OrderType, OwnerId, Params, Side, Symbol, Timestamp};
use crate::exchange::{Exchange, RemotePosition};
use log::{debug, info, warn};
use serde_json::Value;

/// Engine-only keys that must never reach the exchange.
const ENGINE_ONLY_PARAMS: [&str; 2] = ["parent", "transmit"];

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub owner: OwnerId,
    pub symbol: Symbol,
    pub size: f64,
    pub price: Option<f64>,
    pub order_type: Option<OrderType>,
    pub params: Params,
    /// Engine time of the bar that produced the order, sent as `created`.
    pub creation_ts: Timestamp,
}

impl OrderRequest {
    pub fn new(owner: &str, symbol: &str, size: f64, creation_ts: Timestamp) -> Self {
        Self {
            owner: owner.to_string(),
            symbol: symbol.to_string(),
            size,
            price: None,
            order_type: None,
            params: Params::new(),
            creation_ts,
        }
    }

    pub fn limit(mut self, price: f64) -> Self {
        self.price = Some(price);
        self.order_type = Some(OrderType::LIMIT);
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// Engine-facing broker backed by a polled exchange collaborator.
pub struct Broker<E: Exchange> {
    exchange: E,
    currency: String,
    mapping: MappingTable,
    fetch_params: Params,
    ledger: Ledger,
    notifications: NotificationQueue,
    open_orders: Vec<BrokerOrder>,
}

impl<E: Exchange> Broker<E> {
    pub fn new(exchange: E, config: BrokerConfig) -> Self {
        let BrokerConfig {
            currency,
            mapping,
            fetch_params,
        } = config;
        Self {
            exchange,
            currency,
            mapping,
            fetch_params,
            ledger: Ledger::new(),
            notifications: NotificationQueue::new(),
            open_orders: vec![],
        }
    }

    /// Pulls the initial balance and records it as the starting cash/value.
    pub fn start(&mut self) -> Result<()> {
        let (cash, value) = self.get_balance()?;
        self.ledger.set_starting_balance(cash, value);
        info!(
            "broker started: {} cash {} value {}",
            &self.currency, cash, value
        );
        Ok(())
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn open_orders(&self) -> &[BrokerOrder] {
        &self.open_orders
    }

    /// Cached, no network call.
    pub fn get_cash(&self) -> f64 {
        self.ledger.cash()
    }

    /// Cached, no network call.
    pub fn get_value(&self) -> f64 {
        self.ledger.value()
    }

    pub fn get_position(&self, symbol: &str) -> Position {
        self.ledger.position(symbol)
    }

    /// Explicit cash/value refresh from the exchange.
    pub fn get_balance(&mut self) -> Result<(f64, f64)> {
        self.ledger.refresh_balance(&self.exchange, &self.currency)
    }

    /// (free, total) for any currency, leaves the cached figures alone.
    pub fn get_wallet_balance(&self, currency: &str, params: &Params) -> Result<(f64, f64)> {
        let balance = self.exchange.fetch_wallet_balance(currency, params)?;
        Ok(balance.for_currency(currency))
    }

    pub fn get_positions(&self) -> Result<Vec<RemotePosition>> {
        Ok(self.exchange.fetch_positions()?)
    }

    pub fn notify(&self, order: &BrokerOrder) {
        self.notifications.notify(order)
    }

    pub fn get_notification(&self) -> Option<BrokerOrder> {
        self.notifications.next_notification()
    }

    /// One reconciliation pass, called once per engine tick.
    pub fn next(&mut self) -> ReconcileSummary {
        debug!(
            "broker next() called, {} open orders",
            self.open_orders.len()
        );
        let mut ctx = ReconcileContext {
            exchange: &self.exchange,
            mapping: &self.mapping,
            ledger: &mut self.ledger,
            notifications: &self.notifications,
            fetch_params: &self.fetch_params,
            currency: &self.currency,
        };
        reconcile_open_orders(&mut ctx, &mut self.open_orders)
    }

    pub fn buy(&mut self, request: OrderRequest) -> Result<Option<BrokerOrder>> {
        self.submit(Side::BUY, request)
    }

    pub fn sell(&mut self, request: OrderRequest) -> Result<Option<BrokerOrder>> {
        self.submit(Side::SELL, request)
    }

    /// `Ok(None)` for a malformed request (zero size or zero price); no
    /// exchange call is made in that case.
    pub fn submit(&mut self, side: Side, request: OrderRequest) -> Result<Option<BrokerOrder>> {
        if request.size == 0.0 || request.price == Some(0.0) {
            debug!("rejecting malformed order request: {:?}", &request);
            return Ok(None);
        }

        debug!("{} order request: {:?}", side.as_str(), &request);

        let OrderRequest {
            owner,
            symbol,
            size,
            price,
            order_type,
            params,
            creation_ts,
        } = request;

        let order_type = self.mapping.order_type(order_type).to_string();
        let mut params = exchange_params(params);
        params.insert("created".to_string(), Value::from(creation_ts));

        let created = self
            .exchange
            .create_order(&symbol, &order_type, side, size.abs(), price, &params)?;
        let order_id = created.id().ok_or_else(|| BrokerError::MalformedSnapshot {
            order_id: "<none>".to_string(),
            reason: "create response has no id".to_string(),
        })?;
        // the create response may be partial
        debug!("fetching created order {} ({})", order_id, symbol);
        let snapshot = self.exchange.fetch_order(&order_id, &symbol, &params)?;

        let mut order = BrokerOrder::from_snapshot(owner, symbol, snapshot)?;
        // market orders may come back with price 0
        order.price = created.price().filter(|p| *p != 0.0).or(price);
        info!(
            "submitted {} {} {} @ {:?} as order {}",
            side.as_str(),
            size,
            order.symbol(),
            order.price(),
            order.id()
        );

        self.open_orders.push(order.clone());
        self.notify(&order);
        Ok(Some(order))
    }

    /// Cancels unless the exchange already reports the order closed, in
    /// which case the order is returned untouched without a cancel call.
    pub fn cancel(
        &mut self,
        order: &BrokerOrder,
        params: Option<&Params>,
    ) -> Result<BrokerOrder> {
        let empty = Params::new();
        let params = params.unwrap_or(&empty);
        let order_id = order.id();

        debug!("broker cancel() called, fetching order {}", order_id);
        let snapshot = self.exchange.fetch_order(order_id, order.symbol(), params)?;
        if self.mapping.is_closed(&snapshot) {
            debug!("order {} already closed, nothing to cancel", order_id);
            return Ok(order.clone());
        }

        let snapshot = self.exchange.cancel_order(order_id, order.symbol(), params)?;
        debug!(
            "cancel response for {}: {:?}, expected {} == {}",
            order_id,
            snapshot.field(&self.mapping.canceled_order.key),
            &self.mapping.canceled_order.key,
            &self.mapping.canceled_order.value
        );
        if !self.mapping.is_canceled(&snapshot) {
            return Ok(order.clone());
        }

        match find_order(&self.open_orders, order_id) {
            Some(idx) => {
                let mut canceled = self.open_orders.remove(idx);
                canceled.update_snapshot(snapshot);
                canceled.cancel();
                info!("order {} canceled", order_id);
                self.notify(&canceled);
                Ok(canceled)
            }
            None => {
                warn!(
                    "canceled order {} was not in the open set ({} open orders)",
                    order_id,
                    self.open_orders.len()
                );
                Ok(order.clone())
            }
        }
    }

    /// Offsets the remote position for `symbol`. `size` defaults to the full
    /// position; `Ok(None)` when there is nothing to close.
    pub fn close(
        &mut self,
        owner: &str,
        symbol: &str,
        size: Option<f64>,
        creation_ts: Timestamp,
    ) -> Result<Option<BrokerOrder>> {
        debug!("close {} size {:?} for {}", symbol, size, owner);
        let positions = self.exchange.fetch_positions()?;
        let remote = match positions
            .iter()
            .find(|p| same_instrument(&p.symbol, symbol))
        {
            Some(p) => p.position_amt,
            None => {
                debug!("no position to close for {}", symbol);
                return Ok(None);
            }
        };

        let size = size.unwrap_or(remote).abs();
        let request = OrderRequest::new(owner, symbol, size, creation_ts);
        if remote > 0.0 {
            self.sell(request)
        } else if remote < 0.0 {
            self.buy(request)
        } else {
            debug!("position for {} is flat", symbol);
            Ok(None)
        }
    }

    /// One offsetting market order per non-flat remote position, placed on
    /// the exchange's own symbol. Stops at the first exchange failure.
    pub fn close_all(
        &mut self,
        owner: &str,
        creation_ts: Timestamp,
    ) -> Result<Vec<BrokerOrder>> {
        let positions = self.exchange.fetch_positions()?;
        debug!("closing all positions: {:?}", &positions);

        let mut orders = vec![];
        for position in positions.iter().filter(|p| p.position_amt != 0.0) {
            let request = OrderRequest::new(
                owner,
                &position.symbol,
                position.position_amt.abs(),
                creation_ts,
            );
            let side = if position.position_amt > 0.0 {
                Side::SELL
            } else {
                Side::BUY
            };
            if let Some(order) = self.submit(side, request)? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Open orders as the exchange sees them, optionally for one symbol.
    pub fn get_orders_open(&self, symbol: Option<&str>) -> Result<Vec<OrderSnapshot>> {
        let orders = self.exchange.fetch_open_orders(symbol)?;
        Ok(match symbol {
            Some(symbol) => orders
                .into_iter()
                .filter(|o| o.symbol().as_deref() == Some(symbol))
                .collect(),
            None => orders,
        })
    }

    /// Replaces the local open set with the exchange's open orders, e.g.
    /// after a restart. Every adopted order is notified.
    pub fn update_open_orders_force(
        &mut self,
        owner: &str,
        symbol: Option<&str>,
    ) -> Result<usize> {
        let remote_orders = self.get_orders_open(symbol)?;
        let mut adopted = vec![];
        for remote in remote_orders {
            let order_id = match remote.id() {
                Some(id) => id,
                None => {
                    warn!("skipping open order without id: {:?}", &remote);
                    continue;
                }
            };
            let order_symbol = remote
                .symbol()
                .unwrap_or_else(|| symbol.unwrap_or_default().to_string());
            debug!("fetching open order {} ({})", order_id, order_symbol);
            let snapshot = self
                .exchange
                .fetch_order(&order_id, &order_symbol, &Params::new())?;
            let mut order =
                BrokerOrder::from_snapshot(owner.to_string(), order_symbol, snapshot)?;
            order.price = order.snapshot().price();
            if self.mapping.is_open(order.snapshot()) {
                order.accept();
            }
            adopted.push(order);
        }

        info!(
            "replacing {} local open orders with {} exchange orders",
            self.open_orders.len(),
            adopted.len()
        );
        self.open_orders = adopted;
        for order in &self.open_orders {
            self.notifications.notify(order);
        }
        Ok(self.open_orders.len())
    }

    /// Calls a non-unified private endpoint, e.g. `("Get", "order/{id}/cancel")`
    /// resolves to `private_getorder_id_cancel`.
    pub fn private_end_point(
        &self,
        method: &str,
        endpoint: &str,
        params: &Params,
    ) -> Result<Value> {
        let implicit_name = implicit_method_name(method, endpoint);
        debug!(
            "private endpoint {} {} -> {}",
            method, endpoint, &implicit_name
        );
        Ok(self
            .exchange
            .call_private_endpoint(method, &implicit_name, params)?)
    }
}

/// Unwraps `{"params": {...}}` and drops engine-only keys.
fn exchange_params(mut params: Params) -> Params {
    if let Some(Value::Object(inner)) = params.remove("params") {
        params = inner;
    }
    for key in ENGINE_ONLY_PARAMS {
        params.remove(key);
    }
    params
}

pub fn implicit_method_name(method: &str, endpoint: &str) -> String {
    let endpoint: String = endpoint
        .replace('/', "_")
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .collect();
    format!("private_{}{}", method.to_lowercase(), endpoint.to_lowercase())
}

// "ETH/USD" and "ETHUSD" name the same instrument
fn same_instrument(remote: &str, local: &str) -> bool {
    remote == local || remote.replace('/', "") == local.replace('/', "")
}
