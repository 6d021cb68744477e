//! Prediction targets. These read future closes and are never inputs.

use super::Columns;
use crate::domain::Bar;
use crate::indicators::series::shift;

pub const TARGET_COLUMNS: [&str; 6] = [
    "future_return_1h",
    "future_return_6h",
    "future_return_24h",
    "target_direction_1h",
    "target_multiclass_1h",
    "target_return_1h",
];

/// Upper edges of the multiclass bins; anything above the last is class 4.
const MULTICLASS_EDGES: [f64; 4] = [-0.01, -0.002, 0.002, 0.01];

/// `close[t+hours] / close[t] - 1`, missing for the last `hours` rows.
fn future_return(close: &[f64], hours: isize) -> Vec<f64> {
    shift(close, -hours)
        .iter()
        .zip(close)
        .map(|(future, now)| future / now - 1.0)
        .collect()
}

/// Class 0..=4 for a one-hour return: ≤ −1 %, ≤ −0.2 %, ≤ 0.2 %, ≤ 1 %, above.
pub fn multiclass_bin(ret: f64) -> f64 {
    if ret.is_nan() {
        return f64::NAN;
    }
    MULTICLASS_EDGES
        .iter()
        .position(|&edge| ret <= edge)
        .unwrap_or(MULTICLASS_EDGES.len()) as f64
}

pub fn target_columns(bars: &[Bar]) -> Columns {
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let r1 = future_return(&close, 1);
    let direction = r1
        .iter()
        .map(|&r| {
            if r.is_nan() {
                f64::NAN
            } else if r > 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    let multiclass = r1.iter().map(|&r| multiclass_bin(r)).collect();

    vec![
        (TARGET_COLUMNS[0].into(), r1.clone()),
        (TARGET_COLUMNS[1].into(), future_return(&close, 6)),
        (TARGET_COLUMNS[2].into(), future_return(&close, 24)),
        (TARGET_COLUMNS[3].into(), direction),
        (TARGET_COLUMNS[4].into(), multiclass),
        (TARGET_COLUMNS[5].into(), r1),
    ]
}
