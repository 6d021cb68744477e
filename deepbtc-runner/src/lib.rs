//! DeepBTC Runner: configuration and the operations the CLI dispatches.
//!
//! This crate builds on `deepbtc-core` to provide:
//! - TOML pipeline configuration with defaults and env overrides
//! - Fetch stages (one source, or all sources in order)
//! - Feature engine orchestration (load raw tables, compute, publish)
//! - The feature store (CSV plus an optional Parquet copy)
//! - Data validation reports
//! - The live listener reconnect loop

pub mod config;
pub mod engine;
pub mod feature_store;
pub mod listener;
pub mod pipeline;
pub mod validate;

pub use config::{ConfigError, PipelineConfig};
pub use engine::{load_sources, run_features};
pub use feature_store::{FeatureOutput, FeatureStore};
pub use listener::{listen_with, run_listener, ListenSummary, LogSink};
pub use pipeline::{fetch_all, fetch_one, Fetchers, PipelineError};
pub use validate::{validate_data, ValidationReport};
