//! Session and pipeline tuning constants.

/// Heartbeat interval advertised at logon (tag 108), seconds.
pub const HEARTBEAT_INTERVAL_SECS: u32 = 30;

/// Fixed delay between reconnect attempts, seconds.
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// Reconnect attempts before the engine gives up. The process stays
/// alive without a session once this is exhausted.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 1000;

/// Delay between a confirmed logon and subscription dispatch, seconds.
pub const SUBSCRIBE_DELAY_SECS: u64 = 1;

/// Bounded capacity of the tick job queue.
pub const TICK_QUEUE_CAPACITY: usize = 10_000;

/// Bounded capacity of the candle job queue.
pub const CANDLE_QUEUE_CAPACITY: usize = 10_000;

/// Parallel workers consuming the tick queue.
pub const TICK_CONCURRENCY: usize = 5;

/// Global tick-queue throughput ceiling, jobs per second.
pub const TICK_RATE_LIMIT_PER_SEC: u32 = 100;

/// Candle updates are read-modify-write; a single worker keeps
/// per-bucket updates serialized without locks.
pub const CANDLE_CONCURRENCY: usize = 1;

/// Global candle-queue throughput ceiling, jobs per second.
pub const CANDLE_RATE_LIMIT_PER_SEC: u32 = 50;

/// Attempts per queue job before it is dropped.
pub const JOB_MAX_ATTEMPTS: u32 = 3;

/// First retry backoff, seconds. Doubles per attempt.
pub const JOB_BACKOFF_BASE_SECS: u64 = 1;

/// Wall-clock budget per queue job, seconds.
pub const JOB_TIMEOUT_SECS: u64 = 30;

/// Budget for draining workers at shutdown, seconds.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Aggregation granularity recorded on candle rows.
pub const CANDLE_LOTS: i16 = 1;
