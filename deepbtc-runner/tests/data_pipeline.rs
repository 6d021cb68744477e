//! Integration tests for the feature pipeline: raw store in, feature store
//! out, all inside a temporary data directory.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use deepbtc_core::data::RawStore;
use deepbtc_core::domain::{
    bars_to_table, Bar, SourceId, TimeSeriesTable, MACRO_COLUMNS, ONCHAIN_COLUMNS,
    SENTIMENT_COLUMNS,
};
use deepbtc_core::features::{FeatureSet, WarmupPolicy, TARGET_COLUMNS, WARMUP_COLUMN};
use deepbtc_runner::{run_features, validate_data, FeatureStore, PipelineConfig, PipelineError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DAYS: i64 = 30;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn market_table() -> TimeSeriesTable {
    let mut price = 30_000.0;
    let bars: Vec<Bar> = (0..24 * DAYS)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            price += ((seed >> 33) % 400) as f64 - 199.5;
            let open = price - 15.0;
            let close = price + 10.0;
            Bar {
                timestamp: start() + Duration::hours(i),
                open,
                high: open.max(close) + 35.0,
                low: open.min(close) - 35.0,
                close,
                volume: 120.0 + (i % 13) as f64 * 4.0,
            }
        })
        .collect();
    bars_to_table(&bars)
}

fn daily_table(columns: &[&str], scale: f64) -> TimeSeriesTable {
    let ts: Vec<NaiveDateTime> = (0..DAYS).map(|d| start() + Duration::days(d)).collect();
    let cols = columns
        .iter()
        .enumerate()
        .map(|(k, &name)| {
            let values = (0..DAYS)
                .map(|d| scale * (k + 1) as f64 + d as f64 + (d as f64 * 0.9 + k as f64).sin() * 3.0)
                .collect();
            (name, values)
        })
        .collect();
    TimeSeriesTable::from_columns(ts, cols).unwrap()
}

fn seeded_config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.set_data_dir(dir);
    config.features.correlation_window_hours = 48;

    let store = RawStore::new(&config.data.raw_dir);
    store.write(SourceId::Market, &market_table()).unwrap();
    store.write(SourceId::OnChain, &daily_table(&ONCHAIN_COLUMNS, 1_000.0)).unwrap();
    store.write(SourceId::Sentiment, &daily_table(&SENTIMENT_COLUMNS, 20.0)).unwrap();
    store.write(SourceId::Macro, &daily_table(&MACRO_COLUMNS, 100.0)).unwrap();
    config
}

#[test]
fn basic_features_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = seeded_config(dir.path());

    let out = run_features(&config, FeatureSet::Basic).unwrap();
    assert_eq!(out.csv_path, dir.path().join("features/btc_features_basic.csv"));
    assert_eq!(out.warmup_rows, 199);
    assert_eq!(out.meta.rows, 24 * DAYS as usize - 199);

    let table = FeatureStore::new(&config.data.features_dir)
        .read(FeatureSet::Basic)
        .unwrap();
    assert_eq!(table.first_timestamp(), Some(start() + Duration::hours(199)));
    for target in TARGET_COLUMNS {
        assert!(table.column(target).is_some(), "{target}");
    }
    assert!(table.column("SP500").is_none());
    // non-target columns are fully populated after the warmup drop
    for column in table.columns() {
        if !TARGET_COLUMNS.contains(&column.name.as_str()) {
            assert!(column.values.iter().all(|v| !v.is_nan()), "{}", column.name);
        }
    }
}

#[test]
fn complete_features_end_to_end() {
    let dir = TempDir::new().unwrap();
    let mut config = seeded_config(dir.path());
    config.features.warmup = WarmupPolicy::Flag;
    config.data.write_parquet = true;

    let out = run_features(&config, FeatureSet::Complete).unwrap();
    assert_eq!(out.meta.rows, 24 * DAYS as usize);
    assert_eq!(out.meta.columns.last().map(String::as_str), Some(WARMUP_COLUMN));

    let store = FeatureStore::new(&config.data.features_dir);
    let csv = store.read(FeatureSet::Complete).unwrap();
    let parquet = store.read_parquet(FeatureSet::Complete).unwrap();
    assert_eq!(csv, parquet);

    let warmup = csv.column(WARMUP_COLUMN).unwrap();
    assert_eq!(warmup[0], 1.0);
    assert_eq!(warmup[csv.len() - 1], 0.0);
    for name in ["hash_rate_change_7d", "fear_greed_ma_7d", "btc_sp500_correlation"] {
        assert!(csv.column(name).is_some(), "{name}");
    }

    let report = validate_data(&config);
    assert!(!report.has_problems());
    assert_eq!(report.common_start, Some(start()));
    assert_eq!(report.common_end, Some(start() + Duration::hours(24 * DAYS - 1)));
}

#[test]
fn rerun_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let mut config = seeded_config(dir.path());
    config.data.write_parquet = true;

    let first = run_features(&config, FeatureSet::Complete).unwrap();
    let csv_a = fs::read(&first.csv_path).unwrap();
    let meta_a = fs::read(dir.path().join("features/btc_features_complete.csv.meta.json")).unwrap();

    let second = run_features(&config, FeatureSet::Complete).unwrap();
    let csv_b = fs::read(&second.csv_path).unwrap();
    let meta_b = fs::read(dir.path().join("features/btc_features_complete.csv.meta.json")).unwrap();

    assert_eq!(csv_a, csv_b);
    assert_eq!(meta_a, meta_b);
    assert_eq!(first.meta.content_hash, second.meta.content_hash);
}

#[test]
fn missing_raw_table_names_the_source() {
    let dir = TempDir::new().unwrap();
    let config = seeded_config(dir.path());
    fs::remove_file(RawStore::new(&config.data.raw_dir).path(SourceId::Sentiment)).unwrap();

    // basic does not need sentiment
    assert!(run_features(&config, FeatureSet::Basic).is_ok());

    let err = run_features(&config, FeatureSet::Complete).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::MissingInput {
            set: FeatureSet::Complete,
            source_id: SourceId::Sentiment,
        }
    ));
    assert!(err.to_string().contains("sentiment"));
    assert!(!dir.path().join("features/btc_features_complete.csv").exists());
}

#[test]
fn too_short_history_fails_under_drop() {
    let dir = TempDir::new().unwrap();
    let mut config = PipelineConfig::default();
    config.set_data_dir(dir.path());

    let short = market_table().slice(start(), start() + Duration::hours(99));
    RawStore::new(&config.data.raw_dir)
        .write(SourceId::Market, &short)
        .unwrap();

    let err = run_features(&config, FeatureSet::Basic).unwrap_err();
    assert!(matches!(err, PipelineError::Feature { set: FeatureSet::Basic, .. }));
}
