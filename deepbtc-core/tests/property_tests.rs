//! Property tests for table and alignment invariants.
//!
//! Uses proptest to verify:
//! 1. Normalization yields strictly increasing timestamps and keeps the last
//!    observation per timestamp
//! 2. Alignment law: a daily value appears from its day until the next update
//!    and never before
//! 3. A rolling window W leaves exactly W-1 leading missing rows
//! 4. CSV write then read reproduces every value bit for bit

use chrono::{Duration, NaiveDate, NaiveDateTime};
use deepbtc_core::data::align::align_forward_fill;
use deepbtc_core::data::csv_table::{read_csv, to_csv_bytes};
use deepbtc_core::domain::TimeSeriesTable;
use deepbtc_core::indicators::series::{rolling_mean, rolling_std};
use proptest::prelude::*;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

// ── Strategies ───────────────────────────────────────────────────────

fn arb_value() -> impl Strategy<Value = f64> {
    prop_oneof![
        9 => -1.0e12..1.0e12_f64,
        1 => Just(f64::NAN),
    ]
}

/// Hour offsets with duplicates and arbitrary order.
fn arb_offsets() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0..200_i64, 1..60)
}

/// Sorted, unique day offsets for a daily series.
fn arb_days() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(0..20_i64, 1..8).prop_map(|s| s.into_iter().collect())
}

// ── 1. Normalization ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn normalized_is_strictly_increasing(offsets in arb_offsets()) {
        let ts: Vec<NaiveDateTime> = offsets.iter().map(|&h| base() + Duration::hours(h)).collect();
        // value = arrival index, so "last wins" is observable
        let values: Vec<f64> = (0..offsets.len()).map(|i| i as f64).collect();
        let table = TimeSeriesTable::from_columns(ts, vec![("v", values)]).unwrap().normalized();

        prop_assert!(table.validate().is_ok());
        for (row, &t) in table.timestamps().iter().enumerate() {
            let h = (t - base()).num_hours();
            let last_arrival = offsets.iter().rposition(|&o| o == h).unwrap();
            prop_assert_eq!(table.column("v").unwrap()[row], last_arrival as f64);
        }
        let mut unique = offsets.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(table.len(), unique.len());
    }
}

// ── 2. Alignment law ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn daily_value_holds_from_its_day_until_next_update(
        days in arb_days(),
        values in prop::collection::vec(1.0..100.0_f64, 8),
    ) {
        let daily_ts: Vec<NaiveDateTime> = days.iter().map(|&d| base() + Duration::days(d)).collect();
        let daily_values = values[..days.len()].to_vec();
        let daily = TimeSeriesTable::from_columns(daily_ts, vec![("x", daily_values.clone())]).unwrap();

        let axis: Vec<NaiveDateTime> = (0..24 * 22).map(|h| base() + Duration::hours(h)).collect();
        let aligned = align_forward_fill(&axis, &daily);
        let x = aligned.column("x").unwrap();

        for (i, &t) in axis.iter().enumerate() {
            let day = (t - base()).num_days();
            match days.iter().rposition(|&d| d <= day) {
                Some(k) => prop_assert_eq!(x[i], daily_values[k]),
                None => prop_assert!(x[i].is_nan(), "value before first day at hour {}", i),
            }
        }
    }
}

// ── 3. Rolling window boundary ───────────────────────────────────────

proptest! {
    #[test]
    fn rolling_window_has_w_minus_one_warmup(
        values in prop::collection::vec(-1.0e6..1.0e6_f64, 1..120),
        window in 1..40_usize,
    ) {
        for out in [rolling_mean(&values, window), rolling_std(&values, window, 0)] {
            let expected_missing = (window - 1).min(values.len());
            prop_assert!(out[..expected_missing].iter().all(|v| v.is_nan()));
            prop_assert!(out[expected_missing..].iter().all(|v| !v.is_nan()));
        }
    }
}

// ── 4. CSV round trip ────────────────────────────────────────────────

proptest! {
    #[test]
    fn csv_round_trip_is_lossless(
        rows in prop::collection::vec((arb_value(), arb_value()), 1..50),
    ) {
        let ts: Vec<NaiveDateTime> = (0..rows.len() as i64).map(|h| base() + Duration::hours(h)).collect();
        let (a, b): (Vec<f64>, Vec<f64>) = rows.into_iter().unzip();
        let table = TimeSeriesTable::from_columns(ts, vec![("a", a), ("b", b)]).unwrap();

        let bytes = to_csv_bytes(&table).unwrap();
        let back = read_csv(bytes.as_slice()).unwrap();
        prop_assert_eq!(back, table);
    }
}
