pub mod candle_worker;
pub mod tick_worker;

pub use candle_worker::run as run_candle_worker;
pub use tick_worker::run as run_tick_worker;
