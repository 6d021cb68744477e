//! alternative.me Fear & Greed index fetcher (sentiment source).

use super::http::HttpClient;
use super::provider::{finalize_table, DataError, SourceFetcher};
use crate::domain::time::{floor_day, from_unix_seconds};
use crate::domain::{DateRange, SourceId, TimeSeriesTable};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://api.alternative.me";

#[derive(Debug, Deserialize)]
pub struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
    #[serde(default)]
    metadata: Option<FngMetadata>,
}

#[derive(Debug, Deserialize)]
struct FngEntry {
    value: String,
    #[serde(default)]
    value_classification: Option<String>,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct FngMetadata {
    #[serde(default)]
    error: Option<String>,
}

/// One parsed index reading.
#[derive(Debug, Clone, PartialEq)]
pub struct FngReading {
    pub day: NaiveDateTime,
    pub value: f64,
    pub classification: Option<String>,
}

pub fn parse_fng(resp: FngResponse) -> Result<Vec<FngReading>, DataError> {
    if let Some(err) = resp.metadata.and_then(|m| m.error) {
        if !err.trim().is_empty() {
            return Err(DataError::ResponseFormatChanged(format!(
                "fear & greed API error: {err}"
            )));
        }
    }

    resp.data
        .into_iter()
        .map(|entry| {
            let secs: i64 = entry.timestamp.trim().parse().map_err(|_| {
                DataError::ResponseFormatChanged(format!(
                    "fear & greed timestamp is not unix seconds: {:?}",
                    entry.timestamp
                ))
            })?;
            let day = from_unix_seconds(secs).map(floor_day).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!("invalid fear & greed timestamp {secs}"))
            })?;
            let value: f64 = entry.value.trim().parse().map_err(|_| {
                DataError::ResponseFormatChanged(format!(
                    "fear & greed value is not numeric: {:?}",
                    entry.value
                ))
            })?;
            Ok(FngReading {
                day,
                value,
                classification: entry.value_classification,
            })
        })
        .collect()
}

pub struct FearGreedIndex {
    http: Arc<HttpClient>,
    base_url: String,
}

impl FearGreedIndex {
    pub fn new(http: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

impl SourceFetcher for FearGreedIndex {
    fn name(&self) -> &str {
        "alternative.me"
    }

    fn source_id(&self) -> SourceId {
        SourceId::Sentiment
    }

    fn fetch(&self, range: &DateRange) -> Result<TimeSeriesTable, DataError> {
        // the API returns the latest N days, so ask for everything back to the start
        let today = chrono::Utc::now().naive_utc();
        let limit = (today.date() - range.start.date()).num_days().max(0) + 1;
        let url = format!("{}/fng/", self.base_url.trim_end_matches('/'));
        let query = [("limit", limit.to_string()), ("format", "json".to_string())];

        let resp: FngResponse = self.http.get_json(&url, &query)?;
        let readings = parse_fng(resp)?;
        if readings.is_empty() {
            return Err(DataError::NoData("fear & greed index returned no entries".into()));
        }

        let start = floor_day(range.start);
        let (timestamps, values): (Vec<_>, Vec<_>) = readings
            .into_iter()
            .filter(|r| r.day >= start && r.day <= range.end)
            .map(|r| (r.day, r.value))
            .unzip();

        let table = TimeSeriesTable::from_columns(timestamps, vec![("fear_greed_value", values)])?;
        let table = finalize_table(table)?;
        info!(rows = table.len(), "sentiment index fetched");
        Ok(table)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}
