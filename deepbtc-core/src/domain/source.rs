//! Source catalogue: the four raw data sources and their on-disk shape.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Native sampling frequency of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    Daily,
}

impl Frequency {
    /// Length of one observation period.
    pub fn period(self) -> Duration {
        match self {
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::days(1),
        }
    }
}

/// One of the raw data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Market,
    OnChain,
    Sentiment,
    Macro,
}

/// Columns of the on-chain table, in file order.
pub const ONCHAIN_COLUMNS: [&str; 8] = [
    "market_price_usd",
    "hash_rate_th_s",
    "difficulty",
    "tx_count_daily",
    "tx_fees_btc",
    "avg_block_size_mb",
    "mempool_size_bytes",
    "total_btc_supply",
];

pub const SENTIMENT_COLUMNS: [&str; 1] = ["fear_greed_value"];

/// Macro columns that every macro table carries. FRED columns are optional.
pub const MACRO_COLUMNS: [&str; 5] = ["SP500", "NASDAQ", "DXY", "GOLD", "VIX"];

impl SourceId {
    /// Fetch order used by `fetch-all`.
    pub const ALL: [SourceId; 4] = [
        SourceId::Market,
        SourceId::OnChain,
        SourceId::Sentiment,
        SourceId::Macro,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceId::Market => "market",
            SourceId::OnChain => "onchain",
            SourceId::Sentiment => "sentiment",
            SourceId::Macro => "macro",
        }
    }

    /// File name inside the raw directory.
    pub fn file_name(self) -> &'static str {
        match self {
            SourceId::Market => "binance_btcusdt_1h.csv",
            SourceId::OnChain => "blockchain_metrics_daily.csv",
            SourceId::Sentiment => "sentiment_metrics.csv",
            SourceId::Macro => "macro_indicators.csv",
        }
    }

    pub fn frequency(self) -> Frequency {
        match self {
            SourceId::Market => Frequency::Hourly,
            _ => Frequency::Daily,
        }
    }

    /// Columns the feature engine requires from this source.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            SourceId::Market => &super::bar::OHLCV_COLUMNS,
            SourceId::OnChain => &ONCHAIN_COLUMNS,
            SourceId::Sentiment => &SENTIMENT_COLUMNS,
            SourceId::Macro => &MACRO_COLUMNS,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source '{0}' (expected market, onchain, sentiment or macro)")]
pub struct ParseSourceError(pub String);

impl FromStr for SourceId {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(SourceId::Market),
            "onchain" | "blockchain" => Ok(SourceId::OnChain),
            "sentiment" => Ok(SourceId::Sentiment),
            "macro" => Ok(SourceId::Macro),
            _ => Err(ParseSourceError(s.to_string())),
        }
    }
}

/// Inclusive UTC range a fetch should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date range: start {start} is after end {end}")]
pub struct InvalidRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Whole days spanned, counting both partial ends.
    pub fn days(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }
}
