//! Yahoo Finance chart client for daily index closes.
//!
//! Yahoo's v8 chart API has no official contract and changes without notice,
//! so every structural surprise is surfaced as `ResponseFormatChanged`.

use super::http::HttpClient;
use super::provider::DataError;
use crate::domain::time::{floor_day, from_unix_seconds, to_unix_seconds};
use crate::domain::DateRange;
use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// Macro column name and Yahoo ticker for each index.
pub const YAHOO_SERIES: [(&str, &str); 5] = [
    ("SP500", "^GSPC"),
    ("NASDAQ", "^IXIC"),
    ("DXY", "DX-Y.NYB"),
    ("GOLD", "GC=F"),
    ("VIX", "^VIX"),
];

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Daily closes from a chart response, pinned to 00:00 UTC. Days without a
/// close (holidays) are skipped.
pub fn parse_closes(ticker: &str, resp: ChartResponse) -> Result<Vec<(NaiveDateTime, f64)>, DataError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => {
            DataError::NoData(format!("unknown Yahoo ticker {ticker}"))
        }
        Some(err) => {
            DataError::ResponseFormatChanged(format!("{ticker}: {}: {}", err.code, err.description))
        }
        None => DataError::ResponseFormatChanged(format!("{ticker}: empty result with no error")),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("{ticker}: result array is empty")))?;

    let timestamps = data
        .timestamp
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("{ticker}: no timestamps")))?;

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("{ticker}: no quote data")))?;

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let day = from_unix_seconds(ts).map(floor_day).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("{ticker}: invalid timestamp {ts}"))
        })?;
        points.push((day, close));
    }
    Ok(points)
}

/// `^` is not a legal path character; everything else in the tickers is.
fn encode_ticker(ticker: &str) -> String {
    ticker.replace('^', "%5E")
}

/// Fetch daily closes for one ticker over `range`.
pub fn fetch_daily_closes(
    http: &HttpClient,
    base_url: &str,
    ticker: &str,
    range: &DateRange,
) -> Result<Vec<(NaiveDateTime, f64)>, DataError> {
    let url = format!(
        "{}/v8/finance/chart/{}",
        base_url.trim_end_matches('/'),
        encode_ticker(ticker)
    );
    let query = [
        ("period1", to_unix_seconds(floor_day(range.start)).to_string()),
        (
            "period2",
            to_unix_seconds(floor_day(range.end) + Duration::days(1)).to_string(),
        ),
        ("interval", "1d".to_string()),
    ];
    let resp: ChartResponse = http.get_json(&url, &query)?;
    parse_closes(ticker, resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_closes_and_skips_holidays() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"^GSPC"},
            "timestamp":[1577975400,1578061800,1578321000],
            "indicators":{"quote":[{"open":[1,2,3],"close":[3257.85,null,3246.28]}]}}],
            "error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        let points = parse_closes("^GSPC", resp).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].0.to_string(), "2020-01-02 00:00:00");
        assert_eq!(points[0].1, 3257.85);
        assert_eq!(points[1].0.to_string(), "2020-01-06 00:00:00");
    }

    #[test]
    fn not_found_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parse_closes("^NOPE", resp), Err(DataError::NoData(_))));
    }

    #[test]
    fn other_errors_are_format_errors() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        let resp: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            parse_closes("^GSPC", resp),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }

    #[test]
    fn caret_is_percent_encoded() {
        assert_eq!(encode_ticker("^GSPC"), "%5EGSPC");
        assert_eq!(encode_ticker("GC=F"), "GC=F");
    }
}
