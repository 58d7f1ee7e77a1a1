use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable pair from the `currpairdetails` catalog.
///
/// Pairs without a contract size are kept in the catalog but never
/// subscribed and never produce ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Symbol as quoted upstream (e.g. "EURUSD")
    pub symbol: String,

    /// Venue contract size; `None` marks the pair ineligible
    pub contract_size: Option<Decimal>,
}

impl CurrencyPair {
    pub fn new(symbol: impl Into<String>, contract_size: Option<Decimal>) -> Self {
        Self {
            symbol: symbol.into(),
            contract_size,
        }
    }

    /// Eligible pairs are subscribed and materialized; the rest are catalog-only.
    pub fn is_eligible(&self) -> bool {
        self.contract_size.is_some()
    }
}
