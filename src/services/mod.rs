pub mod bootstrap;
pub mod cache;
pub mod candle_store;
pub mod catalog;
pub mod queue;
pub mod rate_limiter;
pub mod tick_store;

pub use cache::Cache;
pub use candle_store::CandleStore;
pub use catalog::PairCatalog;
pub use queue::{Job, JobQueue, JobSender, QueueOptions};
pub use rate_limiter::RateLimiter;
pub use tick_store::TickStore;
