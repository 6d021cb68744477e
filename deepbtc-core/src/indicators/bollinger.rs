//! Bollinger Bands: SMA of close ± multiplier × population stddev.
//!
//! Lines, in column order:
//! - `bb_lower` / `bb_middle` / `bb_upper`
//! - `bb_bandwidth`: (upper - lower) / middle × 100
//! - `bb_percent`: (close - lower) / (upper - lower)
//!
//! Lookback: period - 1 for every line.

use super::series::{rolling_mean, rolling_std};
use super::{closes, Indicator};
use crate::domain::Bar;

const LINES: [&str; 5] = ["bb_lower", "bb_middle", "bb_upper", "bb_bandwidth", "bb_percent"];

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self { period, multiplier }
    }

    /// Middle band and the half-width (multiplier × sd) per bar.
    fn bands(&self, close: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mid = rolling_mean(close, self.period);
        let width = rolling_std(close, self.period, 0)
            .into_iter()
            .map(|sd| self.multiplier * sd)
            .collect();
        (mid, width)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        LINES[0]
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (mid, width) = self.bands(&closes(bars));
        mid.iter().zip(&width).map(|(m, w)| m - w).collect()
    }

    fn lines(&self) -> Vec<(String, usize)> {
        LINES
            .iter()
            .map(|name| (name.to_string(), self.lookback()))
            .collect()
    }

    fn compute_lines(&self, bars: &[Bar]) -> Vec<Vec<f64>> {
        let close = closes(bars);
        let (mid, width) = self.bands(&close);
        let n = close.len();

        let mut lines: Vec<Vec<f64>> = (0..LINES.len()).map(|_| Vec::with_capacity(n)).collect();
        for i in 0..n {
            let upper = mid[i] + width[i];
            let lower = mid[i] - width[i];
            lines[0].push(lower);
            lines[1].push(mid[i]);
            lines[2].push(upper);
            lines[3].push((upper - lower) / mid[i] * 100.0);
            lines[4].push((close[i] - lower) / (upper - lower));
        }
        lines
    }
}
