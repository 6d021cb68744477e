//! Relative Strength Index (RSI), Wilder smoothing.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: avg_loss == 0 → 100; avg_gain == 0 → 0; both zero → 50.

use super::series::{diff, wilder_smooth};
use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let changes = diff(&closes(bars), 1);
        // f64::max would turn NaN into 0.0
        let gains: Vec<f64> = changes
            .iter()
            .map(|&c| if c.is_nan() { c } else { c.max(0.0) })
            .collect();
        let losses: Vec<f64> = changes
            .iter()
            .map(|&c| if c.is_nan() { c } else { (-c).max(0.0) })
            .collect();

        let avg_gain = wilder_smooth(&gains, self.period);
        let avg_loss = wilder_smooth(&losses, self.period);

        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    compute_rsi(g, l)
                }
            })
            .collect()
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains() {
        let result = Rsi::new(3).compute(&make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0]));
        assert!(result[2].is_nan());
        assert_approx(result[3], 100.0, 1e-6);
    }

    #[test]
    fn rsi_all_losses() {
        let result = Rsi::new(3).compute(&make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0]));
        assert_approx(result[3], 0.0, 1e-6);
    }

    #[test]
    fn rsi_seed_value() {
        // changes +0.34, -0.25, -0.48: avg_gain 0.34/3, avg_loss 0.73/3
        let result = Rsi::new(3).compute(&make_bars(&[44.0, 44.34, 44.09, 43.61]));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        for (i, &v) in Rsi::new(3).compute(&bars).iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
            }
        }
    }

    #[test]
    fn rsi_flat_is_neutral() {
        let result = Rsi::new(2).compute(&make_bars(&[10.0, 10.0, 10.0, 10.0]));
        assert_approx(result[3], 50.0, 1e-12);
    }
}
