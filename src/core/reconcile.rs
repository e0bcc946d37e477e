//! Per-tick polling pass over the open-order set.

use crate::core::error::{BrokerError, Result};
use crate::core::ledger::Ledger;
use crate::core::mapping::MappingTable;
use crate::core::notifications::NotificationQueue;
use crate::core::order::BrokerOrder;
use crate::core::types::{OrderId, Params};
use crate::exchange::Exchange;
use log::{debug, error, info, warn};

/// Everything one reconciliation pass touches besides the open orders.
pub struct ReconcileContext<'a, E: Exchange> {
    pub exchange: &'a E,
    pub mapping: &'a MappingTable,
    pub ledger: &'a mut Ledger,
    pub notifications: &'a NotificationQueue,
    pub fetch_params: &'a Params,
    pub currency: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub fills_applied: usize,
    pub completed: usize,
    pub canceled: usize,
    pub failures: Vec<(OrderId, BrokerError)>,
}

impl ReconcileSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Polls every order that is open when the pass starts. A failure on one
/// order is logged and recorded; the remaining orders are still processed.
pub fn reconcile_open_orders<E: Exchange>(
    ctx: &mut ReconcileContext<E>,
    open_orders: &mut Vec<BrokerOrder>,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();
    if open_orders.is_empty() {
        return summary;
    }

    let order_ids: Vec<OrderId> = open_orders.iter().map(|o| o.id.clone()).collect();
    for order_id in order_ids {
        summary.checked += 1;
        if let Err(err) = reconcile_order(ctx, open_orders, &order_id, &mut summary) {
            error!("failed to reconcile order {}: {}", order_id, err);
            summary.failures.push((order_id, err));
        }
    }

    debug!("reconcile summary: {:?}", &summary);
    summary
}

fn reconcile_order<E: Exchange>(
    ctx: &mut ReconcileContext<E>,
    open_orders: &mut Vec<BrokerOrder>,
    order_id: &str,
    summary: &mut ReconcileSummary,
) -> Result<()> {
    let idx = match find_order(open_orders, order_id) {
        Some(idx) => idx,
        None => {
            warn!("order {} left the open set before it was polled", order_id);
            return Ok(());
        }
    };

    let symbol = open_orders[idx].symbol.clone();
    debug!("fetching order {} ({})", order_id, symbol);
    let snapshot = ctx.exchange.fetch_order(order_id, &symbol, ctx.fetch_params)?;
    let fills = snapshot
        .trades()
        .map_err(|reason| BrokerError::MalformedSnapshot {
            order_id: order_id.to_string(),
            reason,
        })?;

    let order = &mut open_orders[idx];
    for fill in fills.iter().flatten() {
        if order.execute(fill) {
            info!(
                "order {} fill {}: {} @ {}",
                order_id, fill.id, fill.amount, fill.price
            );
            summary.fills_applied += 1;
        }
    }
    order.update_snapshot(snapshot);

    let closed = ctx.mapping.is_closed(order.snapshot());
    let canceled = ctx.mapping.is_canceled(order.snapshot());

    if closed {
        let mut order = open_orders.remove(idx);
        let size = order.signed_size();
        let price = order.position_price();
        ctx.ledger.position_mut(&order.symbol).update(size, price);
        order.completed();
        info!("order {} completed: {} @ {:?}", order_id, size, price);
        ctx.notifications.notify(&order);
        summary.completed += 1;
        ctx.ledger.refresh_balance(ctx.exchange, ctx.currency)?;
    }

    // evaluated independently of the closed rule; the open set decides
    if canceled {
        match find_order(open_orders, order_id) {
            Some(idx) => {
                let mut order = open_orders.remove(idx);
                order.cancel();
                info!("order {} canceled on exchange", order_id);
                ctx.notifications.notify(&order);
                summary.canceled += 1;
            }
            None => warn!(
                "order {} matches both closed and canceled rules, kept as completed",
                order_id
            ),
        }
    }

    Ok(())
}

pub(crate) fn find_order(open_orders: &[BrokerOrder], order_id: &str) -> Option<usize> {
    open_orders.iter().position(|o| o.id == order_id)
}
