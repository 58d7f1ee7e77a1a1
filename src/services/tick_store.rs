//! Durable tick storage, one table per `(symbol, side)`.
//!
//! The primary key on `lots` alone means at most one row per distinct
//! lot value — a later tick with the same lot count is silently ignored
//! by `ON CONFLICT DO NOTHING`. Known modelling quirk; preserved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::error::Result;
use crate::models::{Side, Tick};

#[derive(Clone)]
pub struct TickStore {
    pool: PgPool,
}

/// Strip a symbol down to the characters legal in an identifier.
/// Table names are composed by string formatting, not bound parameters.
pub(crate) fn identifier(symbol: &str) -> String {
    symbol
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

impl TickStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn table_name(symbol: &str, side: Side) -> String {
        format!("ticks_{}_{}", identifier(symbol), side.as_str())
    }

    pub async fn ensure_table(&self, symbol: &str, side: Side) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                ticktime timestamptz NOT NULL,
                lots integer PRIMARY KEY,
                price numeric NOT NULL
            )",
            Self::table_name(symbol, side)
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Insert a tick; a conflicting lot value is dropped, not updated.
    pub async fn insert(&self, tick: &Tick) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (ticktime, lots, price) VALUES ($1, $2, $3)
             ON CONFLICT (lots) DO NOTHING",
            Self::table_name(&tick.symbol, tick.side)
        );
        sqlx::query(&sql)
            .bind(tick.ticktime)
            .bind(tick.lots)
            .bind(tick.price)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All stored ticks for one side of a pair, oldest first.
    /// Used by bootstrap to hydrate the cache.
    pub async fn fetch_all(&self, symbol: &str, side: Side) -> Result<Vec<Tick>> {
        let sql = format!(
            "SELECT ticktime, lots, price FROM {} ORDER BY ticktime",
            Self::table_name(symbol, side)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut ticks = Vec::with_capacity(rows.len());
        for row in &rows {
            ticks.push(Tick {
                symbol: symbol.to_string(),
                side,
                ticktime: row.try_get::<DateTime<Utc>, _>("ticktime")?,
                lots: row.try_get::<i32, _>("lots")?,
                price: row.try_get::<Decimal, _>("price")?,
            });
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names_are_lowercased() {
        assert_eq!(TickStore::table_name("EURUSD", Side::Bid), "ticks_eurusd_bid");
        assert_eq!(TickStore::table_name("GBPJPY", Side::Ask), "ticks_gbpjpy_ask");
    }

    #[test]
    fn test_identifier_strips_punctuation() {
        assert_eq!(identifier("EUR/USD"), "eurusd");
        assert_eq!(identifier("BTC-USD.X"), "btcusdx");
    }
}
