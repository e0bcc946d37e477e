use exbroker::common::config::BrokerConfig;
use exbroker::core::broker::{Broker, OrderRequest};
use exbroker::core::error::{BrokerError, ExchangeError};
use exbroker::core::ledger::Position;
use exbroker::core::types::{OrderStatus, OrderType};
use exbroker::exchange::sim::{SimExchange, SimExchangeConfig};
use exbroker::exchange::Exchange;

const BTC: &str = "BTC/USD";

fn sim_broker(strict_execution: bool) -> Broker<SimExchange> {
    let exchange = SimExchange::new(SimExchangeConfig {
        strict_execution,
        ..Default::default()
    });
    let mut broker = Broker::new(exchange, BrokerConfig::default());
    broker.start().unwrap();
    broker
}

fn drain(broker: &Broker<SimExchange>) -> Vec<OrderStatus> {
    let mut statuses = vec![];
    while let Some(order) = broker.get_notification() {
        statuses.push(order.status());
    }
    statuses
}

#[test]
fn limit_order_fills_when_price_crosses() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);

    let order = broker
        .buy(OrderRequest::new("strategy", BTC, 1.0, 1).limit(95.0))
        .unwrap()
        .unwrap();
    assert_eq!(drain(&broker), vec![OrderStatus::SUBMITTED]);

    let summary = broker.next();
    assert_eq!(summary.completed, 0);
    assert_eq!(broker.open_orders().len(), 1);

    broker.exchange().on_price(BTC, 94.0, 2);
    let summary = broker.next();

    assert_eq!(summary.fills_applied, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(drain(&broker), vec![OrderStatus::COMPLETED]);
    assert_eq!(
        broker.get_position(BTC),
        Position {
            size: 1.0,
            price: 95.0
        }
    );
    assert_eq!(broker.get_cash(), 9_905.0);
    assert_eq!(broker.get_value(), 9_999.0);

    let snapshot = broker.exchange().fetch_order(order.id(), BTC, &Default::default());
    let fills = snapshot.unwrap().trades().unwrap().unwrap();
    assert_eq!(fills[0].id, format!("{}-1", order.id()));
    assert_eq!(fills[0].timestamp, Some(2));
}

#[test]
fn market_order_fills_on_submission() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);

    let order = broker
        .buy(OrderRequest::new("strategy", BTC, 2.0, 1))
        .unwrap()
        .unwrap();
    assert_eq!(order.price(), None);
    assert_eq!(order.snapshot().field("status").unwrap(), "closed");

    let summary = broker.next();
    assert_eq!(summary.completed, 1);
    assert_eq!(
        broker.get_position(BTC),
        Position {
            size: 2.0,
            price: 100.0
        }
    );
}

#[test]
fn market_order_without_price_is_rejected() {
    let mut broker = sim_broker(false);

    let err = broker
        .buy(OrderRequest::new("strategy", BTC, 1.0, 1))
        .unwrap_err();

    assert!(matches!(
        err,
        BrokerError::Exchange(ExchangeError::InvalidOrder(_))
    ));
    assert!(broker.open_orders().is_empty());
}

#[test]
fn stop_limit_is_not_supported() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);

    let err = broker
        .buy(
            OrderRequest::new("strategy", BTC, 1.0, 1)
                .with_order_type(OrderType::STOP_LIMIT)
                .with_price(105.0),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        BrokerError::Exchange(ExchangeError::NotSupported(_))
    ));
}

#[test]
fn open_limit_order_can_be_canceled() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);
    let order = broker
        .sell(OrderRequest::new("strategy", BTC, 1.0, 1).limit(110.0))
        .unwrap()
        .unwrap();
    drain(&broker);

    let canceled = broker.cancel(&order, None).unwrap();

    assert_eq!(canceled.status(), OrderStatus::CANCELED);
    assert_eq!(drain(&broker), vec![OrderStatus::CANCELED]);
    assert!(broker.get_orders_open(None).unwrap().is_empty());

    // canceled orders never execute
    broker.exchange().on_price(BTC, 120.0, 2);
    broker.next();
    assert!(broker.get_positions().unwrap().is_empty());
}

#[test]
fn strict_execution_needs_price_through_limit() {
    let mut broker = sim_broker(true);
    broker.exchange().on_price(BTC, 100.0, 1);
    broker
        .buy(OrderRequest::new("strategy", BTC, 1.0, 1).limit(95.0))
        .unwrap();

    broker.exchange().on_price(BTC, 95.0, 2);
    assert_eq!(broker.next().completed, 0);

    broker.exchange().on_price(BTC, 94.5, 3);
    assert_eq!(broker.next().completed, 1);
    assert_eq!(broker.get_position(BTC).price, 95.0);
}

#[test]
fn sell_stop_triggers_at_last_price() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);
    broker
        .sell(
            OrderRequest::new("strategy", BTC, 1.0, 1)
                .with_order_type(OrderType::STOP)
                .with_price(90.0),
        )
        .unwrap();

    broker.exchange().on_price(BTC, 91.0, 2);
    assert_eq!(broker.next().completed, 0);

    broker.exchange().on_price(BTC, 89.0, 3);
    assert_eq!(broker.next().completed, 1);
    assert_eq!(broker.get_position(BTC).size, -1.0);
}

#[test]
fn close_flattens_simulated_position() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);
    broker
        .buy(OrderRequest::new("strategy", BTC, 2.0, 1))
        .unwrap();
    broker.next();

    broker.exchange().on_price(BTC, 110.0, 2);
    let order = broker.close("strategy", BTC, None, 2).unwrap().unwrap();
    assert_eq!(order.size(), 2.0);
    broker.next();

    assert!(broker.get_position(BTC).is_flat());
    assert_eq!(broker.get_position(BTC).price, 0.0);
    assert!(broker.get_positions().unwrap().is_empty());
    assert_eq!(broker.get_cash(), 10_020.0);
    assert!(broker.close("strategy", BTC, None, 3).unwrap().is_none());
}

#[test]
fn wallet_balance_reports_base_asset() {
    let mut broker = sim_broker(false);
    broker.exchange().on_price(BTC, 100.0, 1);
    broker
        .buy(OrderRequest::new("strategy", BTC, 0.5, 1))
        .unwrap();

    let (free, total) = broker
        .get_wallet_balance("BTC", &Default::default())
        .unwrap();
    assert_eq!((free, total), (0.5, 0.5));
    assert_eq!(
        broker.get_wallet_balance("USD", &Default::default()).unwrap(),
        (9_950.0, 10_000.0)
    );
}
