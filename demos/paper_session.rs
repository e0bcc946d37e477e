use exbroker::common::config::BrokerConfig;
use exbroker::common::log::setup_log;
use exbroker::core::broker::{Broker, OrderRequest};
use exbroker::exchange::sim::{SimExchange, SimExchangeConfig};
use log::{error, info, LevelFilter};

const SYMBOL: &str = "BTC/USD";
const OWNER: &str = "paper_strategy";

fn main() {
    if let Err(err) = setup_log(Some(LevelFilter::Debug), None) {
        panic!("{:?}", err)
    }

    let exchange = SimExchange::new(SimExchangeConfig::default());
    let mut broker = Broker::new(exchange, BrokerConfig::default());

    let prices = [100.0, 98.5, 97.0, 99.0, 103.0, 101.5];
    broker.exchange().on_price(SYMBOL, prices[0], 0);
    if let Err(err) = broker.start() {
        error!("failed to start broker: {}", err);
        return;
    }

    for (tick, price) in prices.iter().enumerate() {
        let ts = tick as u64 * 60_000;
        broker.exchange().on_price(SYMBOL, *price, ts);

        let request = match tick {
            0 => Some(OrderRequest::new(OWNER, SYMBOL, 1.0, ts).limit(97.5)),
            1 => Some(OrderRequest::new(OWNER, SYMBOL, 0.5, ts)),
            _ => None,
        };
        if let Some(request) = request {
            if let Err(err) = broker.buy(request) {
                error!("order rejected: {}", err);
            }
        }
        if tick == 4 {
            if let Err(err) = broker.close(OWNER, SYMBOL, None, ts) {
                error!("close failed: {}", err);
            }
        }

        let summary = broker.next();
        info!("tick {} @ {}: {:?}", tick, price, summary);

        while let Some(order) = broker.get_notification() {
            println!(
                "notification: order {} {:?} {} {} executed {}",
                order.id(),
                order.status(),
                order.side().as_str(),
                order.size(),
                order.executed().size
            );
        }
    }

    println!(
        "cash {} value {} position {:?}",
        broker.get_cash(),
        broker.get_value(),
        broker.get_position(SYMBOL)
    );
}
