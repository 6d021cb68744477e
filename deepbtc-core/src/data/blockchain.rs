//! blockchain.info charts fetcher (on-chain source).
//!
//! One request per chart; the eight daily series are joined on their day and
//! forward-filled. A reading taken during a day is stamped at the following
//! midnight, so it never shows up on hours before it was observed.

use super::http::HttpClient;
use super::provider::{assemble_daily, DataError, SourceFetcher};
use crate::domain::time::{ceil_day, from_unix_seconds};
use crate::domain::{DateRange, SourceId, TimeSeriesTable, ONCHAIN_COLUMNS};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://api.blockchain.info";

/// Chart name on blockchain.info, paired by position with [`ONCHAIN_COLUMNS`].
pub const CHARTS: [&str; 8] = [
    "market-price",
    "hash-rate",
    "difficulty",
    "n-transactions",
    "transaction-fees",
    "avg-block-size",
    "mempool-size",
    "total-bitcoins",
];

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    values: Option<Vec<ChartPoint>>,
}

#[derive(Debug, Deserialize)]
struct ChartPoint {
    x: f64,
    y: f64,
}

/// Daily points of one chart, in time order. A point exactly at 00:00 UTC
/// keeps its day; an intraday point moves to the next 00:00, where the last
/// reading of the day wins.
pub fn chart_points(chart: &str, resp: ChartResponse) -> Result<Vec<(NaiveDateTime, f64)>, DataError> {
    if let Some(status) = resp.status.as_deref() {
        if !status.eq_ignore_ascii_case("ok") {
            return Err(DataError::ResponseFormatChanged(format!(
                "chart {chart} returned status '{status}'"
            )));
        }
    }
    let values = resp
        .values
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("chart {chart} has no values")))?;

    let mut points = values
        .into_iter()
        .map(|p| {
            from_unix_seconds(p.x as i64)
                .map(|ts| (ts, p.y))
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("chart {chart}: invalid x {}", p.x))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by_key(|&(ts, _)| ts);

    Ok(points
        .into_iter()
        .map(|(ts, value)| (ceil_day(ts), value))
        .collect())
}

pub struct BlockchainCharts {
    http: Arc<HttpClient>,
    base_url: String,
}

impl BlockchainCharts {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl SourceFetcher for BlockchainCharts {
    fn name(&self) -> &str {
        "blockchain.info"
    }

    fn source_id(&self) -> SourceId {
        SourceId::OnChain
    }

    fn fetch(&self, range: &DateRange) -> Result<TimeSeriesTable, DataError> {
        // timespan counts back from today, so cover the whole distance
        let today = chrono::Utc::now().naive_utc();
        let days = (today.date() - range.start.date()).num_days().max(range.days()) + 1;
        let base = self.base_url.trim_end_matches('/');

        let mut series = Vec::with_capacity(CHARTS.len());
        for (i, (chart, column)) in CHARTS.iter().zip(ONCHAIN_COLUMNS).enumerate() {
            if i > 0 {
                self.http.pause();
            }
            let url = format!("{base}/charts/{chart}");
            let query = [
                ("timespan", format!("{days}days")),
                ("format", "json".to_string()),
                ("sampled", "false".to_string()),
            ];
            let resp: ChartResponse = self.http.get_json(&url, &query)?;
            let points = chart_points(chart, resp)?;
            if points.is_empty() {
                return Err(DataError::NoData(format!("chart {chart} returned no points")));
            }
            debug!(chart, points = points.len(), "fetched chart");
            series.push((column.to_string(), points));
        }

        let table = assemble_daily(series, range)?;
        info!(rows = table.len(), "on-chain metrics fetched");
        Ok(table)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
