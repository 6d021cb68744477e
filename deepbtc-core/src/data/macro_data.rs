//! Macro source: Yahoo index closes, plus FRED series when a key is configured.

use super::fred::{self, FRED_SERIES};
use super::http::HttpClient;
use super::provider::{assemble_daily, DataError, SourceFetcher};
use super::yahoo::{self, YAHOO_SERIES};
use crate::domain::{DateRange, SourceId, TimeSeriesTable};
use std::sync::Arc;
use tracing::{debug, info};

pub struct MacroIndicators {
    http: Arc<HttpClient>,
    yahoo_base_url: String,
    fred_base_url: String,
    fred_api_key: Option<String>,
}

impl MacroIndicators {
    pub fn new(
        http: Arc<HttpClient>,
        yahoo_base_url: impl Into<String>,
        fred_base_url: impl Into<String>,
        fred_api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            yahoo_base_url: yahoo_base_url.into(),
            fred_base_url: fred_base_url.into(),
            fred_api_key: fred_api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn uses_fred(&self) -> bool {
        self.fred_api_key.is_some()
    }
}

impl SourceFetcher for MacroIndicators {
    fn name(&self) -> &str {
        if self.uses_fred() {
            "yahoo+fred"
        } else {
            "yahoo"
        }
    }

    fn source_id(&self) -> SourceId {
        SourceId::Macro
    }

    fn fetch(&self, range: &DateRange) -> Result<TimeSeriesTable, DataError> {
        let mut series = Vec::with_capacity(YAHOO_SERIES.len() + FRED_SERIES.len());

        for (i, (column, ticker)) in YAHOO_SERIES.iter().enumerate() {
            if i > 0 {
                self.http.pause();
            }
            let points = yahoo::fetch_daily_closes(&self.http, &self.yahoo_base_url, ticker, range)?;
            if points.is_empty() {
                return Err(DataError::NoData(format!("no Yahoo closes for {ticker}")));
            }
            debug!(column, ticker, points = points.len(), "fetched index");
            series.push((column.to_string(), points));
        }

        match &self.fred_api_key {
            Some(key) => {
                for (column, series_id) in FRED_SERIES {
                    self.http.pause();
                    let points =
                        fred::fetch_series(&self.http, &self.fred_base_url, key, series_id, range)?;
                    debug!(column, series_id, points = points.len(), "fetched FRED series");
                    series.push((column.to_string(), points));
                }
            }
            None => info!("no FRED API key configured; macro table uses Yahoo series only"),
        }

        let table = assemble_daily(series, range)?;
        info!(rows = table.len(), columns = table.columns().len(), "macro indicators fetched");
        Ok(table)
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::circuit_breaker::CircuitBreaker;
    use crate::data::http::RetryPolicy;
    use std::time::Duration;

    fn client() -> Arc<HttpClient> {
        Arc::new(
            HttpClient::new(
                Duration::from_secs(1),
                RetryPolicy::default(),
                Arc::new(CircuitBreaker::default_provider()),
            )
            .unwrap(),
        )
    }

    #[test]
    fn blank_key_falls_back_to_yahoo() {
        let fetcher = MacroIndicators::new(client(), "y", "f", Some("  ".into()));
        assert!(!fetcher.uses_fred());
        assert_eq!(fetcher.name(), "yahoo");

        let keyed = MacroIndicators::new(client(), "y", "f", Some("abc".into()));
        assert!(keyed.uses_fred());
    }
}
