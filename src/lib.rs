//! Broker adapter between a backtesting/live engine and a unified exchange
//! API. Orders are tracked locally and reconciled against the exchange by
//! polling once per engine tick.

pub mod common;
pub mod core;
pub mod exchange;
