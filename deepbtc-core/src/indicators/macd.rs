//! MACD: difference of two close EMAs, its EMA signal, and the histogram.
//!
//! Lines, in column order: `macd`, `macd_signal`, `macd_hist`.
//! Lookback: slow - 1 for the MACD line, slow + signal - 2 for signal and
//! histogram.

use super::series::ema_of_series;
use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be below slow period");
        Self { fast, slow, signal }
    }

    /// The 12/26/9 configuration.
    pub fn standard() -> Self {
        Self::new(12, 26, 9)
    }

    fn macd_line(&self, bars: &[Bar]) -> Vec<f64> {
        let close = closes(bars);
        let fast = ema_of_series(&close, self.fast);
        let slow = ema_of_series(&close, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn lookback(&self) -> usize {
        self.slow - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.macd_line(bars)
    }

    fn lines(&self) -> Vec<(String, usize)> {
        let signal_lookback = self.slow + self.signal - 2;
        vec![
            ("macd".into(), self.lookback()),
            ("macd_signal".into(), signal_lookback),
            ("macd_hist".into(), signal_lookback),
        ]
    }

    fn compute_lines(&self, bars: &[Bar]) -> Vec<Vec<f64>> {
        let macd = self.macd_line(bars);
        let signal = ema_of_series(&macd, self.signal);
        let hist = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();
        vec![macd, signal, hist]
    }
}
