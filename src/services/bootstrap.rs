//! Startup warm-up: ensure per-pair storage exists and hydrate the
//! cache with durable-store snapshots.
//!
//! Failures here are logged and skipped — the session engine starts
//! regardless of how warm the cache is.

use tracing::{info, warn};

use crate::error::Result;
use crate::models::Side;

use super::cache::Cache;
use super::candle_store::CandleStore;
use super::catalog::PairCatalog;
use super::tick_store::TickStore;

pub async fn warm_start(
    catalog: &PairCatalog,
    tick_store: &TickStore,
    candle_store: &CandleStore,
    cache: &Cache,
) -> Result<()> {
    let mut hydrated = 0usize;

    for pair in catalog.eligible() {
        if let Err(e) = warm_pair(&pair.symbol, tick_store, candle_store, cache).await {
            warn!(symbol = %pair.symbol, error = %e, "Bootstrap failed for pair; continuing");
            continue;
        }
        hydrated += 1;
    }

    info!(pairs = hydrated, "Bootstrap complete");
    Ok(())
}

async fn warm_pair(
    symbol: &str,
    tick_store: &TickStore,
    candle_store: &CandleStore,
    cache: &Cache,
) -> Result<()> {
    tick_store.ensure_table(symbol, Side::Bid).await?;
    tick_store.ensure_table(symbol, Side::Ask).await?;
    candle_store.ensure_table(symbol).await?;

    for side in [Side::Bid, Side::Ask] {
        let ticks = tick_store.fetch_all(symbol, side).await?;
        let items = ticks
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        cache
            .replace_list(&Cache::ticks_key(symbol, side.as_str()), items)
            .await?;
    }

    let candles = candle_store.fetch_all(symbol).await?;
    let items = candles
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    cache
        .replace_list(&Cache::candles_key(symbol), items)
        .await?;

    Ok(())
}
