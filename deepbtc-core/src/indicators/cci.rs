//! Commodity Channel Index.
//!
//! typical price tp = (high + low + close) / 3
//! CCI = (tp − SMA(tp)) / (0.015 × mean absolute deviation of tp)
//! Lookback: period − 1.

use super::series::{rolling_apply, rolling_mean};
use super::Indicator;
use crate::domain::Bar;

const LAMBERT: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
    name: String,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "CCI period must be >= 1");
        Self {
            period,
            name: format!("cci_{period}"),
        }
    }
}

impl Indicator for Cci {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let tp: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
        let mean = rolling_mean(&tp, self.period);
        let mad = rolling_apply(&tp, self.period, |w| {
            let m = w.iter().sum::<f64>() / w.len() as f64;
            w.iter().map(|v| (v - m).abs()).sum::<f64>() / w.len() as f64
        });

        tp.iter()
            .zip(mean.iter().zip(&mad))
            .map(|(&t, (&m, &d))| {
                if d == 0.0 {
                    f64::NAN
                } else {
                    (t - m) / (LAMBERT * d)
                }
            })
            .collect()
    }
}
