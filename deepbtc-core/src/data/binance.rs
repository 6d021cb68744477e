//! Binance spot klines fetcher (market source).
//!
//! Pages through `GET /api/v3/klines` from the range start, advancing past the
//! last open time of each page, until the range end or a short page.

use super::http::HttpClient;
use super::provider::{finalize_table, DataError, SourceFetcher};
use crate::domain::time::{from_unix_millis, to_unix_millis};
use crate::domain::{bars_to_table, Bar, DateRange, SourceId, TimeSeriesTable};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// The only kline interval the feature engine accepts: its windows count hours.
pub const HOURLY_INTERVAL: &str = "1h";

pub struct BinanceKlines {
    http: Arc<HttpClient>,
    base_url: String,
    symbol: String,
    interval: String,
    page_limit: u32,
}

impl BinanceKlines {
    pub fn new(
        http: Arc<HttpClient>,
        base_url: impl Into<String>,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        page_limit: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            symbol: symbol.into(),
            interval: interval.into(),
            page_limit: page_limit.clamp(1, 1000),
        }
    }

    fn klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url.trim_end_matches('/'))
    }
}

/// Length of a kline interval such as `1h` or `15m`, in milliseconds.
pub fn interval_millis(interval: &str) -> Option<i64> {
    let (last, _) = interval.char_indices().last()?;
    let (digits, unit) = interval.split_at(last);
    let n: i64 = digits.parse().ok()?;
    let unit_ms = match unit {
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        _ => return None,
    };
    (n > 0).then_some(n * unit_ms)
}

fn number_field(row: &[Value], idx: usize, field: &str) -> Result<f64, DataError> {
    let cell = row
        .get(idx)
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("kline row missing {field}")))?;
    match cell {
        Value::String(s) => s.parse::<f64>().map_err(|_| {
            DataError::ResponseFormatChanged(format!("kline {field} is not numeric: {s:?}"))
        }),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("kline {field} out of range"))),
        other => Err(DataError::ResponseFormatChanged(format!(
            "kline {field} has unexpected type: {other}"
        ))),
    }
}

/// Parse one kline array `[open_time_ms, "open", "high", "low", "close", "volume", ...]`.
pub fn parse_kline(row: &[Value]) -> Result<Bar, DataError> {
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| DataError::ResponseFormatChanged("kline row missing open time".into()))?;
    let timestamp = from_unix_millis(open_time).ok_or_else(|| {
        DataError::ResponseFormatChanged(format!("invalid kline open time: {open_time}"))
    })?;

    Ok(Bar {
        timestamp,
        open: number_field(row, 1, "open")?,
        high: number_field(row, 2, "high")?,
        low: number_field(row, 3, "low")?,
        close: number_field(row, 4, "close")?,
        volume: number_field(row, 5, "volume")?,
    })
}

impl SourceFetcher for BinanceKlines {
    fn name(&self) -> &str {
        "binance"
    }

    fn source_id(&self) -> SourceId {
        SourceId::Market
    }

    fn fetch(&self, range: &DateRange) -> Result<TimeSeriesTable, DataError> {
        let step = interval_millis(&self.interval).ok_or_else(|| {
            DataError::ValidationError(format!("unsupported kline interval '{}'", self.interval))
        })?;
        let url = self.klines_url();
        let end_ms = to_unix_millis(range.end);
        let mut since = to_unix_millis(range.start);
        let mut bars: Vec<Bar> = Vec::new();
        let mut pages = 0usize;

        while since <= end_ms {
            let query = [
                ("symbol", self.symbol.clone()),
                ("interval", self.interval.clone()),
                ("startTime", since.to_string()),
                ("endTime", end_ms.to_string()),
                ("limit", self.page_limit.to_string()),
            ];
            let rows: Vec<Vec<Value>> = self.http.get_json(&url, &query)?;
            pages += 1;
            if rows.is_empty() {
                break;
            }

            let page_len = rows.len();
            let mut last_open = since;
            for row in &rows {
                let bar = parse_kline(row)?;
                last_open = to_unix_millis(bar.timestamp);
                bars.push(bar);
            }
            debug!(page = pages, rows = page_len, "fetched kline page");

            since = last_open + step;
            if page_len < self.page_limit as usize {
                break;
            }
            self.http.pause();
        }

        if bars.is_empty() {
            return Err(DataError::NoData(format!(
                "no {} klines for {} between {} and {}",
                self.interval, self.symbol, range.start, range.end
            )));
        }

        info!(symbol = %self.symbol, pages, bars = bars.len(), "market klines fetched");
        finalize_table(bars_to_table(&bars))
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
