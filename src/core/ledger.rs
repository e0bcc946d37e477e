use crate::core::error::Result;
use crate::core::types::Symbol;
use crate::exchange::Exchange;
use log::debug;
use std::collections::HashMap;

/// Signed size with its average entry price.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub size: f64,
    pub price: f64,
}

impl Position {
    /// Applies a signed size change. Adding to a position averages the
    /// price, reducing keeps it, flipping resets it to the new price.
    pub fn update(&mut self, size: f64, price: Option<f64>) {
        let old_size = self.size;
        self.size += size;

        let price = match price {
            Some(price) => price,
            None => {
                if self.size == 0.0 {
                    self.price = 0.0;
                }
                return;
            }
        };

        if self.size == 0.0 {
            self.price = 0.0;
        } else if old_size == 0.0 || old_size.signum() != self.size.signum() {
            self.price = price;
        } else if old_size.signum() == size.signum() {
            self.price = (self.price * old_size + price * size) / self.size;
        }
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0.0
    }
}

/// Local positions plus cash/value cached from the last balance pull.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    positions: HashMap<Symbol, Position>,
    cash: f64,
    value: f64,
    starting_cash: f64,
    starting_value: f64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, symbol: &str) -> Position {
        self.positions.get(symbol).copied().unwrap_or_default()
    }

    pub fn position_mut(&mut self, symbol: &str) -> &mut Position {
        self.positions.entry(symbol.to_string()).or_default()
    }

    pub fn positions(&self) -> &HashMap<Symbol, Position> {
        &self.positions
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn starting_cash(&self) -> f64 {
        self.starting_cash
    }

    pub fn starting_value(&self) -> f64 {
        self.starting_value
    }

    /// Pulls free/total for `currency` into the cached cash/value.
    pub fn refresh_balance<E: Exchange>(
        &mut self,
        exchange: &E,
        currency: &str,
    ) -> Result<(f64, f64)> {
        let balance = exchange.fetch_balance()?;
        let (cash, value) = balance.for_currency(currency);
        debug!(
            "balance refreshed for {}: cash {} value {}",
            currency, cash, value
        );
        self.cash = cash;
        self.value = value;
        Ok((cash, value))
    }

    pub(crate) fn set_starting_balance(&mut self, cash: f64, value: f64) {
        self.starting_cash = cash;
        self.starting_value = value;
    }
}
