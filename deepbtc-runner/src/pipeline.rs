//! Fetch stages: builds the four source fetchers from configuration and runs
//! them one by one against the raw store.
//!
//! All fetchers share one HTTP client and one circuit breaker, so a provider
//! block on any stage stops the remaining stages without further requests.

use crate::config::{ConfigError, PipelineConfig};
use chrono::NaiveDateTime;
use deepbtc_core::data::{
    fetch_sources, BinanceKlines, BlockchainCharts, DataError, FearGreedIndex, FetchProgress,
    FetchSummary, HttpClient, ListenError, MacroIndicators, RawStore, SourceFetcher,
};
use deepbtc_core::domain::{DateRange, SourceId};
use deepbtc_core::features::{FeatureError, FeatureSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("fetch {source_id}: {source}")]
    Fetch {
        source_id: SourceId,
        #[source]
        source: DataError,
    },

    #[error("features {set}: raw table '{source_id}' is missing, run `deepbtc fetch {source_id}` first")]
    MissingInput { set: FeatureSet, source_id: SourceId },

    #[error("features {set}: {source}")]
    Feature {
        set: FeatureSet,
        #[source]
        source: FeatureError,
    },

    #[error("{operation}: {source}")]
    Data {
        operation: &'static str,
        #[source]
        source: DataError,
    },

    #[error("parquet {path}: {message}")]
    Parquet { path: PathBuf, message: String },

    #[error("live listener: {0}")]
    Listen(#[from] ListenError),
}

/// The four fetchers, wired to one shared HTTP client.
pub struct Fetchers {
    pub market: BinanceKlines,
    pub onchain: BlockchainCharts,
    pub sentiment: FearGreedIndex,
    pub macro_data: MacroIndicators,
}

impl Fetchers {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        let breaker = Arc::new(config.http.circuit_breaker());
        let http = HttpClient::new(config.http.timeout(), config.http.retry_policy(), breaker)
            .map_err(|source| PipelineError::Data {
                operation: "http client",
                source,
            })?;
        let http = Arc::new(http);

        Ok(Self {
            market: BinanceKlines::new(
                Arc::clone(&http),
                &config.market.base_url,
                &config.market.symbol,
                &config.market.interval,
                config.market.page_limit,
            ),
            onchain: BlockchainCharts::new(Arc::clone(&http), &config.onchain.base_url),
            sentiment: FearGreedIndex::new(Arc::clone(&http), &config.sentiment.base_url),
            macro_data: MacroIndicators::new(
                http,
                &config.macro_data.yahoo_base_url,
                &config.macro_data.fred_base_url,
                config.macro_data.fred_api_key.clone(),
            ),
        })
    }

    pub fn get(&self, source_id: SourceId) -> &dyn SourceFetcher {
        match source_id {
            SourceId::Market => &self.market,
            SourceId::OnChain => &self.onchain,
            SourceId::Sentiment => &self.sentiment,
            SourceId::Macro => &self.macro_data,
        }
    }

    /// Every fetcher in `fetch-all` order.
    pub fn ordered(&self) -> Vec<&dyn SourceFetcher> {
        SourceId::ALL.iter().map(|&id| self.get(id)).collect()
    }
}

fn fetch_range(config: &PipelineConfig, now: NaiveDateTime) -> Result<DateRange, PipelineError> {
    Ok(config.date_range(now)?)
}

/// Fetch one source and overwrite its raw table. Returns the rows written.
pub fn fetch_one(
    config: &PipelineConfig,
    source_id: SourceId,
    now: NaiveDateTime,
    progress: &dyn FetchProgress,
) -> Result<usize, PipelineError> {
    let range = fetch_range(config, now)?;
    let fetchers = Fetchers::from_config(config)?;
    let store = RawStore::new(&config.data.raw_dir);
    info!(source = %source_id, start = %range.start, end = %range.end, "fetch started");

    let summary = fetch_sources(&[fetchers.get(source_id)], &store, &range, progress);
    into_single_result(summary, source_id)
}

fn into_single_result(summary: FetchSummary, source_id: SourceId) -> Result<usize, PipelineError> {
    if let Some((source_id, source)) = summary.errors.into_iter().next() {
        return Err(PipelineError::Fetch { source_id, source });
    }
    summary
        .succeeded
        .first()
        .map(|&(_, rows)| rows)
        .ok_or(PipelineError::Fetch {
            source_id,
            source: DataError::NoData("fetch produced no result".into()),
        })
}

/// Fetch every source in order. Individual failures are collected in the
/// summary; only setup errors are returned as `Err`.
pub fn fetch_all(
    config: &PipelineConfig,
    now: NaiveDateTime,
    progress: &dyn FetchProgress,
) -> Result<FetchSummary, PipelineError> {
    let range = fetch_range(config, now)?;
    let fetchers = Fetchers::from_config(config)?;
    let store = RawStore::new(&config.data.raw_dir);
    info!(start = %range.start, end = %range.end, "fetch-all started");

    let summary = fetch_sources(&fetchers.ordered(), &store, &range, progress);
    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed(),
        "fetch-all finished"
    );
    Ok(summary)
}
