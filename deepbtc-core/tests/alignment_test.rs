//! End-to-end alignment: hourly market for 2020-01-01..2020-01-10 with macro
//! points on 01-01, 01-05 and 01-09.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use deepbtc_core::data::align::align_forward_fill;
use deepbtc_core::domain::{
    bars_to_table, Bar, SourceId, TimeSeriesTable, MACRO_COLUMNS, ONCHAIN_COLUMNS,
    SENTIMENT_COLUMNS,
};
use deepbtc_core::features::{build_features, FeatureOptions, FeatureSet, WarmupPolicy};
use std::collections::BTreeMap;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn hourly_market() -> TimeSeriesTable {
    let bars: Vec<Bar> = (0..24 * 10)
        .map(|h| {
            let close = 7_200.0 + (h as f64 * 0.21).sin() * 60.0 + h as f64;
            Bar {
                timestamp: at(1, 0) + Duration::hours(h),
                open: close - 5.0,
                high: close + 20.0,
                low: close - 25.0,
                close,
                volume: 100.0 + (h % 7) as f64,
            }
        })
        .collect();
    bars_to_table(&bars)
}

fn macro_table() -> TimeSeriesTable {
    let ts = vec![at(1, 0), at(5, 0), at(9, 0)];
    let columns = MACRO_COLUMNS
        .iter()
        .enumerate()
        .map(|(k, &name)| {
            let base = 100.0 * (k + 1) as f64;
            (name, vec![base + 1.0, base + 5.0, base + 9.0])
        })
        .collect();
    TimeSeriesTable::from_columns(ts, columns).unwrap()
}

fn daily_table(columns: &[&str]) -> TimeSeriesTable {
    let ts: Vec<NaiveDateTime> = (1..=10).map(|d| at(d, 0)).collect();
    let cols = columns
        .iter()
        .map(|&name| (name, (1..=10).map(|d| 40.0 + d as f64).collect()))
        .collect();
    TimeSeriesTable::from_columns(ts, cols).unwrap()
}

fn expected_sp500(t: NaiveDateTime) -> f64 {
    if t < at(5, 0) {
        101.0
    } else if t < at(9, 0) {
        105.0
    } else {
        109.0
    }
}

#[test]
fn macro_values_hold_until_next_update() {
    let market = hourly_market();
    let aligned = align_forward_fill(market.timestamps(), &macro_table());
    let sp500 = aligned.column("SP500").unwrap();

    for (i, &t) in market.timestamps().iter().enumerate() {
        assert_eq!(sp500[i], expected_sp500(t), "at {t}");
    }
    let row = |t: NaiveDateTime| market.timestamps().iter().position(|&x| x == t).unwrap();
    assert_eq!(sp500[row(at(4, 23))], 101.0);
    assert_eq!(sp500[row(at(5, 0))], 105.0);
    assert_eq!(sp500[row(at(10, 23))], 109.0);
}

#[test]
fn complete_features_carry_as_of_values_and_truncate() {
    let sources = BTreeMap::from([
        (SourceId::Market, hourly_market()),
        (SourceId::OnChain, daily_table(&ONCHAIN_COLUMNS)),
        (SourceId::Sentiment, daily_table(&SENTIMENT_COLUMNS)),
        (SourceId::Macro, macro_table()),
    ]);
    let opts = FeatureOptions {
        warmup: WarmupPolicy::Flag,
        correlation_window: 24,
        ..FeatureOptions::default()
    };
    let out = build_features(FeatureSet::Complete, &sources, &opts).unwrap();
    let table = &out.table;

    // macro coverage ends on 01-09 23:00
    assert_eq!(table.first_timestamp(), Some(at(1, 0)));
    assert_eq!(table.last_timestamp(), Some(at(9, 23)));

    let sp500 = table.column("SP500").unwrap();
    for (i, &t) in table.timestamps().iter().enumerate() {
        assert_eq!(sp500[i], expected_sp500(t), "at {t}");
    }
}

#[test]
fn publication_lag_delays_daily_values() {
    let sources = BTreeMap::from([
        (SourceId::Market, hourly_market()),
        (SourceId::OnChain, daily_table(&ONCHAIN_COLUMNS)),
        (SourceId::Sentiment, daily_table(&SENTIMENT_COLUMNS)),
        (SourceId::Macro, macro_table()),
    ]);
    let opts = FeatureOptions {
        warmup: WarmupPolicy::Flag,
        correlation_window: 24,
        lag_hours: BTreeMap::from([(SourceId::Macro, 6)]),
    };
    let out = build_features(FeatureSet::Complete, &sources, &opts).unwrap();
    let table = &out.table;

    // the shifted macro table starts at 01-01 06:00
    assert_eq!(table.first_timestamp(), Some(at(1, 6)));
    let sp500 = table.column("SP500").unwrap();
    let row = |t: NaiveDateTime| table.timestamps().iter().position(|&x| x == t).unwrap();
    assert_eq!(sp500[row(at(5, 5))], 101.0);
    assert_eq!(sp500[row(at(5, 6))], 105.0);
}
