use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, Result};

/// Quote side, from MDEntryType (tag 269): `0` = bid, `1` = ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Map a raw MDEntryType code. Entry types outside {0, 1} are not quotes.
    pub fn from_md_entry_type(code: &str) -> Option<Side> {
        match code {
            "0" => Some(Side::Bid),
            "1" => Some(Side::Ask),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A quote entry as it came off the wire, before normalization.
/// Lives only inside the tick pipeline job payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuote {
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Tag 273 as received, `HH:MM:SS`, when present
    pub source_time: Option<String>,
    /// MDReqID (tag 262) the entry arrived under
    pub req_id: String,
}

/// A normalized, persistable quote observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub side: Side,
    pub ticktime: DateTime<Utc>,
    pub lots: i32,
    pub price: Decimal,
}

impl Tick {
    /// Normalize a raw quote against the pair's contract size.
    ///
    /// `lots = round(size / contract_size)`. A missing or zero contract
    /// size rejects the quote; the pipeline retries and then drops it.
    /// Tag 273 wall time is applied to today's UTC date — `now` supplies
    /// both the date and the fallback timestamp.
    pub fn normalize(
        quote: &RawQuote,
        contract_size: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Tick> {
        let contract_size = contract_size.ok_or_else(|| {
            AppError::Rejected(format!("no contract size for {}", quote.symbol))
        })?;
        if contract_size.is_zero() {
            return Err(AppError::Rejected(format!(
                "zero contract size for {}",
                quote.symbol
            )));
        }

        // Half-away-from-zero, not the Decimal default of banker's rounding
        let lots = (quote.size / contract_size)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i32()
            .ok_or_else(|| {
                AppError::Rejected(format!(
                    "lot count out of range for {} (size {})",
                    quote.symbol, quote.size
                ))
            })?;

        let ticktime = match &quote.source_time {
            Some(raw) => {
                let time = NaiveTime::parse_from_str(raw, "%H:%M:%S").map_err(|_| {
                    AppError::Rejected(format!("malformed entry time {:?}", raw))
                })?;
                Utc.from_utc_datetime(&now.date_naive().and_time(time))
            }
            None => now,
        };

        Ok(Tick {
            symbol: quote.symbol.clone(),
            side: quote.side,
            ticktime,
            lots,
            price: quote.price,
        })
    }
}
