//! Tick pipeline consumer.
//!
//! Normalizes raw quotes and dual-writes them: cache append first, then
//! the durable insert. BID ticks additionally feed the candle engine.
//! Retries are the queue's job; this worker only reports failure.

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::models::{CandleJob, Side, TickJob};
use crate::services::catalog::{self, PairCatalog};
use crate::services::queue::{Job, JobQueue, JobSender};
use crate::services::{Cache, TickStore};

pub async fn run(
    queue: JobQueue<TickJob>,
    catalog: Arc<PairCatalog>,
    pool: PgPool,
    cache: Cache,
    candle_jobs: JobSender<CandleJob>,
) {
    info!(worker = "Tick", "Tick worker started");
    let tick_store = TickStore::new(pool.clone());

    queue
        .run(move |job: Job<TickJob>| {
            let catalog = catalog.clone();
            let pool = pool.clone();
            let cache = cache.clone();
            let tick_store = tick_store.clone();
            let candle_jobs = candle_jobs.clone();
            async move { process(job, &catalog, &pool, &cache, &tick_store, &candle_jobs).await }
        })
        .await;

    info!(worker = "Tick", "Tick worker stopped");
}

async fn process(
    job: Job<TickJob>,
    catalog: &PairCatalog,
    pool: &PgPool,
    cache: &Cache,
    tick_store: &TickStore,
    candle_jobs: &JobSender<CandleJob>,
) -> crate::error::Result<()> {
    let quote = &job.payload.quote;

    // Catalog first; the durable store only covers a pair that had no
    // contract size when the catalog was read
    let contract_size = match catalog.contract_size(&quote.symbol) {
        Some(cs) => Some(cs),
        None => {
            warn!(
                worker = "Tick",
                symbol = %quote.symbol,
                "Contract size missing from catalog; falling back to store"
            );
            catalog::lookup_contract_size(pool, &quote.symbol).await?
        }
    };

    let tick = crate::models::Tick::normalize(quote, contract_size, Utc::now())?;

    // Cache append happens before the durable insert; the cache may
    // briefly hold ticks the store rejects on conflict
    cache.push_tick(&tick).await?;
    tick_store.insert(&tick).await?;

    debug!(
        worker = "Tick",
        job = %job.id,
        symbol = %tick.symbol,
        side = %tick.side,
        lots = tick.lots,
        price = %tick.price,
        "Tick persisted"
    );

    if tick.side == Side::Bid {
        candle_jobs
            .enqueue(job.id.clone(), CandleJob::for_all_timeframes(tick))
            .await?;
    }

    Ok(())
}
