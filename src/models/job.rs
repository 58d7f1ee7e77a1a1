use serde::{Deserialize, Serialize};

use super::{RawQuote, Tick, Timeframe};

/// Payload for the tick pipeline: one raw quote to normalize and persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickJob {
    pub quote: RawQuote,
}

/// Payload for the candle engine: one persisted tick to fold into every
/// active timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleJob {
    pub tick: Tick,
    pub timeframes: Vec<Timeframe>,
}

impl CandleJob {
    /// A job covering all active timeframes.
    pub fn for_all_timeframes(tick: Tick) -> Self {
        Self {
            tick,
            timeframes: Timeframe::all().to_vec(),
        }
    }
}
