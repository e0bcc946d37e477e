use crate::core::error::{BrokerError, Result};
use crate::core::snapshot::{Fill, OrderSnapshot};
use crate::core::types::{FillId, OrderId, OrderStatus, OwnerId, Side, Symbol, Timestamp};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionInfo {
    pub size: f64,
    pub value: f64,
    pub price: f64,
    pub last_fill_ts: Option<Timestamp>,
}

/// Locally tracked order: engine-side view plus the last raw snapshot the
/// exchange returned for it.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerOrder {
    pub(crate) id: OrderId,
    pub(crate) owner: OwnerId,
    pub(crate) symbol: Symbol,
    pub(crate) side: Side,
    pub(crate) size: f64,
    pub(crate) price: Option<f64>,
    pub(crate) snapshot: OrderSnapshot,
    pub(crate) executed_fills: Vec<FillId>,
    pub(crate) executed: ExecutionInfo,
    pub(crate) status: OrderStatus,
}

impl BrokerOrder {
    pub fn from_snapshot(owner: OwnerId, symbol: Symbol, snapshot: OrderSnapshot) -> Result<Self> {
        let id = snapshot.id().ok_or_else(|| BrokerError::MalformedSnapshot {
            order_id: "<none>".to_string(),
            reason: "order has no id".to_string(),
        })?;
        let malformed = |reason: &str| BrokerError::MalformedSnapshot {
            order_id: id.clone(),
            reason: reason.to_string(),
        };
        let side = snapshot.side().ok_or_else(|| malformed("order has no side"))?;
        let size = snapshot
            .amount()
            .ok_or_else(|| malformed("order has no amount"))?
            .abs();

        Ok(Self {
            id,
            owner,
            symbol,
            side,
            size,
            price: None,
            snapshot,
            executed_fills: vec![],
            executed: ExecutionInfo::default(),
            status: OrderStatus::SUBMITTED,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Negative for sells.
    pub fn signed_size(&self) -> f64 {
        self.side.sign() * self.size
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn snapshot(&self) -> &OrderSnapshot {
        &self.snapshot
    }

    pub fn executed(&self) -> &ExecutionInfo {
        &self.executed
    }

    pub fn executed_fills(&self) -> &[FillId] {
        &self.executed_fills
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Price used for the position update on completion: creation price,
    /// then average fill price, then whatever the snapshot says.
    pub fn position_price(&self) -> Option<f64> {
        self.price
            .or_else(|| (self.executed.size > 0.0).then(|| self.executed.price))
            .or_else(|| self.snapshot.price())
    }

    pub(crate) fn update_snapshot(&mut self, snapshot: OrderSnapshot) {
        self.snapshot = snapshot;
    }

    /// Returns false when the fill was already applied.
    pub(crate) fn execute(&mut self, fill: &Fill) -> bool {
        if self.executed_fills.contains(&fill.id) {
            return false;
        }

        let amount = fill.amount.abs();
        self.executed.size += amount;
        self.executed.value += amount * fill.price;
        if self.executed.size > 0.0 {
            self.executed.price = self.executed.value / self.executed.size;
        }
        if fill.timestamp.is_some() {
            self.executed.last_fill_ts = fill.timestamp;
        }
        self.executed_fills.push(fill.id.clone());

        if !self.status.is_terminal() {
            self.status = OrderStatus::PARTIALLY_FILLED;
        }
        true
    }

    pub(crate) fn accept(&mut self) {
        if self.status == OrderStatus::SUBMITTED {
            self.status = OrderStatus::ACCEPTED;
        }
    }

    pub(crate) fn completed(&mut self) {
        self.status = OrderStatus::COMPLETED;
    }

    pub(crate) fn cancel(&mut self) {
        self.status = OrderStatus::CANCELED;
    }
}
