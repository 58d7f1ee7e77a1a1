//! Redis mirror of the tick and candle state.
//!
//! Tick lists are append-only (`RPUSH`); live candles are single keys
//! updated read-modify-write by the candle worker; bootstrap replaces
//! whole lists with durable-store snapshots.
//!
//! The underlying `ConnectionManager` re-establishes its connection on
//! demand, so session reconnects never open a second connection.

use chrono::{DateTime, SecondsFormat, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::error::Result;
use crate::models::{Candle, Tick, Timeframe};

#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl Cache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        info!(url = %url, "Cache connected");
        Ok(Self { conn })
    }

    /// Liveness probe; used by the session engine's reconnect path.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    /// Key of the ordered tick list for one side of a pair.
    pub fn ticks_key(symbol: &str, side: &str) -> String {
        format!("ticks_{}_{}", symbol.to_lowercase(), side)
    }

    /// Key of the bootstrap candle snapshot for a pair.
    pub fn candles_key(symbol: &str) -> String {
        format!("candles_{}", symbol.to_lowercase())
    }

    /// Key of a live candle record.
    pub fn candle_key(symbol: &str, timeframe: Timeframe, candletime: DateTime<Utc>) -> String {
        format!(
            "candle_{}_{}_{}",
            symbol.to_lowercase(),
            timeframe,
            candletime.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Append one tick to its side's ordered list.
    pub async fn push_tick(&self, tick: &Tick) -> Result<()> {
        let key = Self::ticks_key(&tick.symbol, tick.side.as_str());
        let payload = serde_json::to_string(tick)?;
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, payload).await?;
        Ok(())
    }

    /// Read the live candle for a bucket, if the cache holds one.
    pub async fn read_candle(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candletime: DateTime<Utc>,
    ) -> Result<Option<Candle>> {
        let key = Self::candle_key(symbol, timeframe, candletime);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Write the live candle for a bucket.
    pub async fn write_candle(&self, candle: &Candle) -> Result<()> {
        let key = Self::candle_key(&candle.symbol, candle.timeframe, candle.candletime);
        let payload = serde_json::to_string(candle)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, payload).await?;
        Ok(())
    }

    /// Replace a list key with a snapshot (bootstrap hydration).
    pub async fn replace_list(&self, key: &str, items: Vec<String>) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        if !items.is_empty() {
            let _: () = conn.rpush(key, items).await?;
        }
        Ok(())
    }
}
