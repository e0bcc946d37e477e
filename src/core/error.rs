use crate::core::types::OrderId;
use thiserror::Error;

/// Failures reported by the exchange collaborator. The broker never retries
/// or translates these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("exchange error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error("malformed snapshot for order {order_id}: {reason}")]
    MalformedSnapshot { order_id: OrderId, reason: String },
}

pub type Result<T> = std::result::Result<T, BrokerError>;
