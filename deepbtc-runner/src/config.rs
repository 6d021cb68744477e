//! Pipeline configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. The FRED API key can also come from the
//! `FRED_API_KEY` environment variable, which wins over the file.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use deepbtc_core::data::{binance, blockchain, fred, sentiment, stream, yahoo};
use deepbtc_core::data::{CircuitBreaker, RetryPolicy};
use deepbtc_core::domain::time::{floor_hour, start_of_day};
use deepbtc_core::domain::{DateRange, SourceId};
use deepbtc_core::features::{FeatureOptions, WarmupPolicy, DEFAULT_CORRELATION_WINDOW};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const FRED_API_KEY_ENV: &str = "FRED_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration passed to every pipeline operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub http: HttpConfig,
    pub market: MarketConfig,
    pub onchain: OnChainConfig,
    pub sentiment: SentimentConfig,
    #[serde(rename = "macro")]
    pub macro_data: MacroConfig,
    pub features: FeaturesConfig,
    pub listener: ListenerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub raw_dir: PathBuf,
    pub features_dir: PathBuf,
    pub start_date: NaiveDate,
    /// Inclusive last day; `None` means up to the current hour.
    pub end_date: Option<NaiveDate>,
    pub write_parquet: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            features_dir: PathBuf::from("data/features"),
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end_date: None,
            write_parquet: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub request_pause_ms: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_threshold: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            request_pause_ms: 250,
            breaker_cooldown_secs: 1800,
            breaker_threshold: 3,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            request_pause: Duration::from_millis(self.request_pause_ms),
        }
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(
            Duration::from_secs(self.breaker_cooldown_secs),
            self.breaker_threshold,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketConfig {
    pub base_url: String,
    pub symbol: String,
    pub interval: String,
    pub page_limit: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: binance::DEFAULT_BASE_URL.to_string(),
            symbol: "BTCUSDT".to_string(),
            interval: binance::HOURLY_INTERVAL.to_string(),
            page_limit: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OnChainConfig {
    pub base_url: String,
}

impl Default for OnChainConfig {
    fn default() -> Self {
        Self {
            base_url: blockchain::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentConfig {
    pub base_url: String,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            base_url: sentiment::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MacroConfig {
    pub yahoo_base_url: String,
    pub fred_base_url: String,
    pub fred_api_key: Option<String>,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            yahoo_base_url: yahoo::DEFAULT_BASE_URL.to_string(),
            fred_base_url: fred::DEFAULT_BASE_URL.to_string(),
            fred_api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeaturesConfig {
    pub warmup: WarmupPolicy,
    pub correlation_window_hours: usize,
    /// Publication lag per source name, in hours.
    pub lag_hours: BTreeMap<String, i64>,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            warmup: WarmupPolicy::Drop,
            correlation_window_hours: DEFAULT_CORRELATION_WINDOW,
            lag_hours: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    pub url: String,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            url: stream::DEFAULT_STREAM_URL.to_string(),
            initial_backoff_ms: 1000,
            max_backoff_ms: 60_000,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document. Does not read the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    /// Load from `path`, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise start from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let mut config = Self::default();
                config.apply_env(|key| std::env::var(key).ok());
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(FRED_API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.macro_data.fred_api_key = Some(key);
        }
    }

    /// Point both stores below `dir` (`dir/raw`, `dir/features`).
    pub fn set_data_dir(&mut self, dir: &Path) {
        self.data.raw_dir = dir.join("raw");
        self.data.features_dir = dir.join("features");
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(end) = self.data.end_date {
            if end < self.data.start_date {
                return Err(ConfigError::Invalid(format!(
                    "data.end_date {end} is before data.start_date {}",
                    self.data.start_date
                )));
            }
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be > 0".into()));
        }
        if self.http.breaker_threshold == 0 {
            return Err(ConfigError::Invalid(
                "http.breaker_threshold must be > 0".into(),
            ));
        }
        if !(1..=1000).contains(&self.market.page_limit) {
            return Err(ConfigError::Invalid(format!(
                "market.page_limit must be in 1..=1000, got {}",
                self.market.page_limit
            )));
        }
        if self.market.interval != binance::HOURLY_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "market.interval must be '{}' (feature windows count hourly bars), got '{}'",
                binance::HOURLY_INTERVAL,
                self.market.interval
            )));
        }
        if self.features.correlation_window_hours < 2 {
            return Err(ConfigError::Invalid(
                "features.correlation_window_hours must be >= 2".into(),
            ));
        }
        if self.listener.initial_backoff_ms == 0
            || self.listener.initial_backoff_ms > self.listener.max_backoff_ms
        {
            return Err(ConfigError::Invalid(format!(
                "listener backoff must satisfy 0 < initial ({}) <= max ({})",
                self.listener.initial_backoff_ms, self.listener.max_backoff_ms
            )));
        }
        self.lag_hours()?;
        Ok(())
    }

    /// Fetch range: midnight of `start_date` to the end of `end_date`, or to
    /// the hour containing `now` when no end date is set.
    pub fn date_range(&self, now: NaiveDateTime) -> Result<DateRange, ConfigError> {
        let start = start_of_day(self.data.start_date);
        let end = match self.data.end_date {
            Some(d) => start_of_day(d) + ChronoDuration::days(1) - ChronoDuration::seconds(1),
            None => floor_hour(now),
        };
        DateRange::new(start, end).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn lag_hours(&self) -> Result<BTreeMap<SourceId, i64>, ConfigError> {
        self.features
            .lag_hours
            .iter()
            .map(|(name, &hours)| {
                let source_id: SourceId = name
                    .parse()
                    .map_err(|e| ConfigError::Invalid(format!("features.lag_hours: {e}")))?;
                if hours < 0 {
                    return Err(ConfigError::Invalid(format!(
                        "features.lag_hours.{name} must be >= 0, got {hours}"
                    )));
                }
                Ok((source_id, hours))
            })
            .collect()
    }

    pub fn to_feature_options(&self) -> Result<FeatureOptions, ConfigError> {
        Ok(FeatureOptions {
            warmup: self.features.warmup,
            correlation_window: self.features.correlation_window_hours,
            lag_hours: self.lag_hours()?,
        })
    }
}
