//! Durable candle storage, one table per symbol.
//!
//! Updates use `GREATEST`/`LEAST` rather than unconditional overwrite so
//! a retried candle job converges to the same row instead of clobbering
//! extrema recorded by an earlier attempt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::constants::CANDLE_LOTS;
use crate::error::Result;
use crate::models::{Candle, Timeframe};

use super::tick_store::identifier;

#[derive(Clone)]
pub struct CandleStore {
    pool: PgPool,
}

impl CandleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn table_name(symbol: &str) -> String {
        format!("candles_{}_bid", identifier(symbol))
    }

    pub async fn ensure_table(&self, symbol: &str) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                candlesize text NOT NULL,
                lots smallint NOT NULL,
                candletime timestamptz NOT NULL,
                open numeric(12,5),
                high numeric(12,5),
                low numeric(12,5),
                close numeric(12,5),
                PRIMARY KEY (candlesize, lots, candletime)
            )",
            Self::table_name(symbol)
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Fold one tick price into the row for `(timeframe, candletime)`:
    /// update extrema and close if the row exists, otherwise open a flat
    /// candle at `price`.
    pub async fn apply(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candletime: DateTime<Utc>,
        price: Decimal,
    ) -> Result<()> {
        let table = Self::table_name(symbol);

        let existing = sqlx::query(&format!(
            "SELECT 1 FROM {} WHERE candlesize = $1 AND lots = $2 AND candletime = $3",
            table
        ))
        .bind(timeframe.as_str())
        .bind(CANDLE_LOTS)
        .bind(candletime)
        .fetch_optional(&self.pool)
        .await?;

        if existing.is_some() {
            sqlx::query(&format!(
                "UPDATE {} SET high = GREATEST(high, $1), low = LEAST(low, $1), close = $1
                 WHERE candlesize = $2 AND lots = $3 AND candletime = $4",
                table
            ))
            .bind(price)
            .bind(timeframe.as_str())
            .bind(CANDLE_LOTS)
            .bind(candletime)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(&format!(
                "INSERT INTO {} (candlesize, lots, candletime, open, high, low, close)
                 VALUES ($1, $2, $3, $4, $4, $4, $4)",
                table
            ))
            .bind(timeframe.as_str())
            .bind(CANDLE_LOTS)
            .bind(candletime)
            .bind(price)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// All stored candles for a pair, oldest first. Used by bootstrap.
    pub async fn fetch_all(&self, symbol: &str) -> Result<Vec<Candle>> {
        let sql = format!(
            "SELECT candlesize, lots, candletime, open, high, low, close
             FROM {} ORDER BY candletime",
            Self::table_name(symbol)
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            let label: String = row.try_get("candlesize")?;
            let timeframe = match Timeframe::from_label(&label) {
                Some(tf) => tf,
                None => {
                    warn!(symbol = %symbol, candlesize = %label, "Unknown candlesize; skipping row");
                    continue;
                }
            };
            candles.push(Candle {
                symbol: symbol.to_string(),
                timeframe,
                lots: row.try_get::<i16, _>("lots")?,
                candletime: row.try_get::<DateTime<Utc>, _>("candletime")?,
                open: row.try_get::<Decimal, _>("open")?,
                high: row.try_get::<Decimal, _>("high")?,
                low: row.try_get::<Decimal, _>("low")?,
                close: row.try_get::<Decimal, _>("close")?,
            });
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_is_lowercased() {
        assert_eq!(CandleStore::table_name("EURUSD"), "candles_eurusd_bid");
    }
}
