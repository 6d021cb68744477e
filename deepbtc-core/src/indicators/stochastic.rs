//! Stochastic oscillator (slow form).
//!
//! raw %K = 100 × (close − lowest low) / (highest high − lowest low) over `k`
//! %K = SMA(raw %K, smooth_k), %D = SMA(%K, d)
//! Lines, in column order: `stoch_k`, `stoch_d`.
//! Lookback: k + smooth_k − 2 for %K, plus d − 1 for %D.

use super::series::{rolling_max, rolling_mean, rolling_min};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Stochastic {
    k: usize,
    smooth_k: usize,
    d: usize,
}

impl Stochastic {
    pub fn new(k: usize, smooth_k: usize, d: usize) -> Self {
        assert!(k >= 1 && smooth_k >= 1 && d >= 1, "stochastic periods must be >= 1");
        Self { k, smooth_k, d }
    }
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        "stoch_k"
    }

    fn lookback(&self) -> usize {
        self.k + self.smooth_k - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let hh = rolling_max(&highs, self.k);
        let ll = rolling_min(&lows, self.k);

        let raw: Vec<f64> = bars
            .iter()
            .enumerate()
            .map(|(i, b)| 100.0 * (b.close - ll[i]) / (hh[i] - ll[i]))
            .collect();
        rolling_mean(&raw, self.smooth_k)
    }

    fn lines(&self) -> Vec<(String, usize)> {
        vec![
            ("stoch_k".into(), self.lookback()),
            ("stoch_d".into(), self.lookback() + self.d - 1),
        ]
    }

    fn compute_lines(&self, bars: &[Bar]) -> Vec<Vec<f64>> {
        let k = self.compute(bars);
        let d = rolling_mean(&k, self.d);
        vec![k, d]
    }
}
