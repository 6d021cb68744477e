//! Session VWAP anchored at 00:00 UTC.
//!
//! Cumulative typical price × volume over cumulative volume, reset at the
//! first bar of every UTC day. Missing while the session has no volume.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct Vwap;

impl Vwap {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for Vwap {
    fn name(&self) -> &str {
        "vwap"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = Vec::with_capacity(bars.len());
        let mut session = None;
        let (mut pv, mut vol) = (0.0, 0.0);

        for bar in bars {
            let day = bar.timestamp.date();
            if session != Some(day) {
                session = Some(day);
                pv = 0.0;
                vol = 0.0;
            }
            let tp = bar.typical_price();
            if !tp.is_nan() && !bar.volume.is_nan() {
                pv += tp * bar.volume;
                vol += bar.volume;
            }
            out.push(if vol > 0.0 { pv / vol } else { f64::NAN });
        }
        out
    }
}
