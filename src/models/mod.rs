mod candle;
mod currency_pair;
mod job;
mod tick;

pub use candle::{Candle, Timeframe};
pub use currency_pair::CurrencyPair;
pub use job::{CandleJob, TickJob};
pub use tick::{RawQuote, Side, Tick};
