//! Process wiring: storage, cache, bootstrap, queues, session, shutdown.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{
    CANDLE_CONCURRENCY, CANDLE_QUEUE_CAPACITY, CANDLE_RATE_LIMIT_PER_SEC, JOB_BACKOFF_BASE_SECS,
    JOB_MAX_ATTEMPTS, JOB_TIMEOUT_SECS, SHUTDOWN_TIMEOUT_SECS, TICK_CONCURRENCY,
    TICK_QUEUE_CAPACITY, TICK_RATE_LIMIT_PER_SEC,
};
use crate::error::Result;
use crate::fix::FixSession;
use crate::models::{CandleJob, TickJob};
use crate::services::queue::{self, QueueOptions};
use crate::services::{bootstrap, Cache, CandleStore, PairCatalog, TickStore};
use crate::worker;

fn tick_queue_options() -> QueueOptions {
    QueueOptions {
        name: "ticks",
        capacity: TICK_QUEUE_CAPACITY,
        concurrency: TICK_CONCURRENCY,
        rate_limit_per_sec: TICK_RATE_LIMIT_PER_SEC,
        max_attempts: JOB_MAX_ATTEMPTS,
        backoff_base: Duration::from_secs(JOB_BACKOFF_BASE_SECS),
        job_timeout: Duration::from_secs(JOB_TIMEOUT_SECS),
    }
}

fn candle_queue_options() -> QueueOptions {
    QueueOptions {
        name: "candles",
        capacity: CANDLE_QUEUE_CAPACITY,
        concurrency: CANDLE_CONCURRENCY,
        rate_limit_per_sec: CANDLE_RATE_LIMIT_PER_SEC,
        max_attempts: JOB_MAX_ATTEMPTS,
        backoff_base: Duration::from_secs(JOB_BACKOFF_BASE_SECS),
        job_timeout: Duration::from_secs(JOB_TIMEOUT_SECS),
    }
}

/// Run the daemon until SIGINT. Returns once shutdown has drained.
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.pg_url())
        .await?;
    info!(host = %config.pg_host, database = %config.pg_database, "Durable store connected");

    let cache = Cache::connect(&config.redis_url()).await?;

    let catalog = Arc::new(PairCatalog::load(&pool).await?);
    let tick_store = TickStore::new(pool.clone());
    let candle_store = CandleStore::new(pool.clone());

    if let Err(e) = bootstrap::warm_start(&catalog, &tick_store, &candle_store, &cache).await {
        warn!(error = %e, "Bootstrap failed; starting with a cold cache");
    }

    let (tick_tx, tick_queue) = queue::channel::<TickJob>(tick_queue_options());
    let (candle_tx, candle_queue) = queue::channel::<CandleJob>(candle_queue_options());

    let tick_handle = tokio::spawn(worker::run_tick_worker(
        tick_queue,
        catalog.clone(),
        pool.clone(),
        cache.clone(),
        candle_tx,
    ));
    let candle_handle = tokio::spawn(worker::run_candle_worker(
        candle_queue,
        cache.clone(),
        candle_store,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let session = FixSession::new(
        config.fix.clone(),
        catalog.eligible_symbols(),
        tick_tx,
        Some(cache.clone()),
    );
    let session_handle = tokio::spawn(session.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    // Session first: it sends the Logout and owns the last tick sender.
    // Once it is gone the queues drain and the workers exit on their own.
    let _ = shutdown_tx.send(true);
    let drain = async {
        let _ = session_handle.await;
        let _ = tick_handle.await;
        let _ = candle_handle.await;
    };
    if timeout(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS), drain)
        .await
        .is_err()
    {
        warn!(
            timeout_secs = SHUTDOWN_TIMEOUT_SECS,
            "Shutdown drain timed out; exiting anyway"
        );
    }

    pool.close().await;
    info!("Shutdown complete");
    Ok(())
}
