//! Fear & Greed columns on the hourly axis.

use super::Columns;
use crate::domain::{TableError, TimeSeriesTable};
use crate::indicators::series::{diff, rolling_mean};

const WEEK: usize = 24 * 7;
const EXTREME_FEAR: f64 = 25.0;
const EXTREME_GREED: f64 = 75.0;

fn flag(values: &[f64], hit: impl Fn(f64) -> bool) -> Vec<f64> {
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else if hit(v) {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn sentiment_columns(aligned: &TimeSeriesTable) -> Result<Columns, TableError> {
    let fng = aligned.require("fear_greed_value")?;
    Ok(vec![
        ("fear_greed_value".into(), fng.to_vec()),
        ("fear_greed_change_7d".into(), diff(fng, WEEK)),
        ("fear_greed_ma_7d".into(), rolling_mean(fng, WEEK)),
        ("extreme_fear".into(), flag(fng, |v| v < EXTREME_FEAR)),
        ("extreme_greed".into(), flag(fng, |v| v > EXTREME_GREED)),
    ])
}
