pub mod broker;
pub mod error;
pub mod ledger;
pub mod mapping;
pub mod notifications;
pub mod order;
pub mod reconcile;
pub mod snapshot;
pub mod types;
