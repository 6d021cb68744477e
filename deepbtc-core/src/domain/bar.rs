//! Bar: typed view of one market row.

use super::table::{TableError, TimeSeriesTable};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column names of the market table, in file order.
pub const OHLCV_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Hourly OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLCV sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    /// Typical price `(high + low + close) / 3`.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Read the OHLCV columns of a market table as bars.
pub fn bars_from_table(table: &TimeSeriesTable) -> Result<Vec<Bar>, TableError> {
    let open = table.require("open")?;
    let high = table.require("high")?;
    let low = table.require("low")?;
    let close = table.require("close")?;
    let volume = table.require("volume")?;

    Ok(table
        .timestamps()
        .iter()
        .enumerate()
        .map(|(i, &timestamp)| Bar {
            timestamp,
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        })
        .collect())
}

/// Build a market table from bars. Bars must already be in timestamp order.
pub fn bars_to_table(bars: &[Bar]) -> TimeSeriesTable {
    let mut table = TimeSeriesTable::new(bars.iter().map(|b| b.timestamp).collect());
    let columns: [(&str, fn(&Bar) -> f64); 5] = [
        ("open", |b| b.open),
        ("high", |b| b.high),
        ("low", |b| b.low),
        ("close", |b| b.close),
        ("volume", |b| b.volume),
    ];
    for (name, field) in columns {
        table.insert_column_unchecked(name, bars.iter().map(field).collect());
    }
    table
}
