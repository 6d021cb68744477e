//! Williams %R: −100 × (highest high − close) / (highest high − lowest low).
//!
//! Lookback: period − 1. A zero-width range is missing.

use super::series::{rolling_max, rolling_min};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
    name: String,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self {
            period,
            name: format!("willr_{period}"),
        }
    }
}

impl Indicator for WilliamsR {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let hh = rolling_max(&highs, self.period);
        let ll = rolling_min(&lows, self.period);

        bars.iter()
            .enumerate()
            .map(|(i, b)| {
                let range = hh[i] - ll[i];
                if range == 0.0 {
                    f64::NAN
                } else {
                    -100.0 * (hh[i] - b.close) / range
                }
            })
            .collect()
    }
}
