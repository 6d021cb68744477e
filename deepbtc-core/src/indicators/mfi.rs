//! Money Flow Index: a volume-weighted RSI over the typical price.
//!
//! Lookback: period (money flow direction needs the previous bar).

use super::series::rolling_sum;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
    name: String,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self {
            period,
            name: format!("mfi_{period}"),
        }
    }
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let tp: Vec<f64> = bars.iter().map(Bar::typical_price).collect();
        let mut positive = vec![f64::NAN; n];
        let mut negative = vec![f64::NAN; n];

        for i in 1..n {
            let flow = tp[i] * bars[i].volume;
            if flow.is_nan() || tp[i - 1].is_nan() {
                continue;
            }
            positive[i] = if tp[i] > tp[i - 1] { flow } else { 0.0 };
            negative[i] = if tp[i] < tp[i - 1] { flow } else { 0.0 };
        }

        let pos = rolling_sum(&positive, self.period);
        let neg = rolling_sum(&negative, self.period);
        pos.iter()
            .zip(&neg)
            .map(|(&p, &m)| {
                if p.is_nan() || m.is_nan() {
                    f64::NAN
                } else if m == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + p / m)
                }
            })
            .collect()
    }
}
