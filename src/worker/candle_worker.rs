//! Candle engine consumer.
//!
//! For each active timeframe: bucket the tick, read-modify-write the
//! live cache candle, then fold the price into the durable row. The two
//! paths are not transactional with each other; both are idempotent, so
//! a retried job converges. Correctness of the read-modify-write relies
//! on this queue running at concurrency 1.

use tracing::{debug, info};

use crate::models::{Candle, CandleJob};
use crate::services::queue::{Job, JobQueue};
use crate::services::{Cache, CandleStore};

pub async fn run(queue: JobQueue<CandleJob>, cache: Cache, candle_store: CandleStore) {
    info!(worker = "Candle", "Candle worker started");

    queue
        .run(move |job: Job<CandleJob>| {
            let cache = cache.clone();
            let candle_store = candle_store.clone();
            async move { process(job, &cache, &candle_store).await }
        })
        .await;

    info!(worker = "Candle", "Candle worker stopped");
}

async fn process(
    job: Job<CandleJob>,
    cache: &Cache,
    candle_store: &CandleStore,
) -> crate::error::Result<()> {
    let tick = &job.payload.tick;

    // Any timeframe failing aborts the job; the retry re-applies all of
    // them, which the GREATEST/LEAST update absorbs
    for &timeframe in &job.payload.timeframes {
        let candletime = timeframe.bucket(tick.ticktime);

        let candle = match cache.read_candle(&tick.symbol, timeframe, candletime).await? {
            Some(mut candle) => {
                candle.apply(tick.price);
                candle
            }
            None => Candle::open_at(tick.symbol.clone(), timeframe, candletime, tick.price),
        };
        cache.write_candle(&candle).await?;

        candle_store
            .apply(&tick.symbol, timeframe, candletime, tick.price)
            .await?;

        debug!(
            worker = "Candle",
            job = %job.id,
            symbol = %tick.symbol,
            timeframe = %timeframe,
            candletime = %candletime,
            close = %candle.close,
            "Candle updated"
        );
    }

    Ok(())
}
