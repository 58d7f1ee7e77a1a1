//! Currency-pair catalog.
//!
//! Read once from `currpairdetails` at bootstrap and immutable for the
//! rest of the run. The durable-store lookup remains only for the rare
//! pair that had no contract size at boot; that path is an error path.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::error::Result;
use crate::models::CurrencyPair;

#[derive(Debug)]
pub struct PairCatalog {
    pairs: Vec<CurrencyPair>,
    contract_sizes: HashMap<String, Decimal>,
}

impl PairCatalog {
    pub fn new(pairs: Vec<CurrencyPair>) -> Self {
        let contract_sizes = pairs
            .iter()
            .filter_map(|p| p.contract_size.map(|cs| (p.symbol.clone(), cs)))
            .collect();
        Self {
            pairs,
            contract_sizes,
        }
    }

    /// Load the catalog from the durable store.
    pub async fn load(pool: &PgPool) -> Result<Self> {
        let rows = sqlx::query("SELECT currpair, contractsize FROM currpairdetails")
            .fetch_all(pool)
            .await?;

        let mut pairs = Vec::with_capacity(rows.len());
        for row in &rows {
            pairs.push(CurrencyPair::new(
                row.try_get::<String, _>("currpair")?,
                row.try_get::<Option<Decimal>, _>("contractsize")?,
            ));
        }

        let catalog = Self::new(pairs);
        info!(
            pairs = catalog.pairs.len(),
            eligible = catalog.eligible().count(),
            "Currency-pair catalog loaded"
        );
        Ok(catalog)
    }

    /// Contract size for a symbol, if the catalog knows one.
    pub fn contract_size(&self, symbol: &str) -> Option<Decimal> {
        self.contract_sizes.get(symbol).copied()
    }

    /// Pairs that get subscribed and materialized.
    pub fn eligible(&self) -> impl Iterator<Item = &CurrencyPair> {
        self.pairs.iter().filter(|p| p.is_eligible())
    }

    pub fn eligible_symbols(&self) -> Vec<String> {
        self.eligible().map(|p| p.symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Durable-store fallback for a contract size the catalog is missing.
pub async fn lookup_contract_size(pool: &PgPool, symbol: &str) -> Result<Option<Decimal>> {
    let row = sqlx::query("SELECT contractsize FROM currpairdetails WHERE currpair = $1")
        .bind(symbol)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(row.try_get::<Option<Decimal>, _>("contractsize")?),
        None => Ok(None),
    }
}
