use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::CANDLE_LOTS;

/// Candle timeframes the aggregation runs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1-minute candles
    M1,
    /// 1-hour candles
    H1,
    /// Daily candles
    D1,
}

impl Timeframe {
    /// Bucket duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        match self {
            Timeframe::M1 => 60_000,
            Timeframe::H1 => 3_600_000,
            Timeframe::D1 => 86_400_000,
        }
    }

    /// Label used in candle rows (`candlesize`) and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "M1",
            Timeframe::H1 => "H1",
            Timeframe::D1 => "D1",
        }
    }

    pub fn from_label(label: &str) -> Option<Timeframe> {
        match label {
            "M1" => Some(Timeframe::M1),
            "H1" => Some(Timeframe::H1),
            "D1" => Some(Timeframe::D1),
            _ => None,
        }
    }

    /// All active timeframes.
    pub fn all() -> &'static [Timeframe] {
        &[Timeframe::M1, Timeframe::H1, Timeframe::D1]
    }

    /// Floor a timestamp to this timeframe's bucket boundary.
    pub fn bucket(&self, time: DateTime<Utc>) -> DateTime<Utc> {
        let duration = self.duration_ms();
        let bucket_ms = (time.timestamp_millis() / duration) * duration;
        Utc.timestamp_millis_opt(bucket_ms).unwrap()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-bucket OHLC summary.
///
/// `lots` is the aggregation granularity stamped on every row, not the
/// tick's lot count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub lots: i16,
    pub candletime: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Candle {
    /// Open a bucket from its first tick: all four prices equal.
    pub fn open_at(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        candletime: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            lots: CANDLE_LOTS,
            candletime,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Fold a later tick in the same bucket into the candle.
    /// `open` never changes after creation.
    pub fn apply(&mut self, price: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
    }

    /// OHLC integrity check.
    pub fn is_valid(&self) -> bool {
        self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}
