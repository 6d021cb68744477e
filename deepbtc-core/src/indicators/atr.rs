//! Average True Range (ATR), Wilder smoothing.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! Lookback: period (TR needs a previous close).

use super::series::wilder_smooth;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series. TR[0] is NaN: without a previous close it is not a
/// true range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for i in 1..bars.len() {
        let (h, l, pc) = (bars[i].high, bars[i].low, bars[i - 1].close);
        if !(h.is_nan() || l.is_nan() || pc.is_nan()) {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_previous_close() {
        let mut bars = make_bars(&[100.0, 100.0]);
        bars[1].high = 101.0;
        bars[1].low = 99.5;
        bars[0].close = 90.0;
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 11.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_of_constant_range() {
        // make_bars on a flat series gives high - low = 2 every bar
        let result = Atr::new(3).compute(&make_bars(&[50.0; 8]));
        assert!(result[..3].iter().all(|v| v.is_nan()));
        for v in &result[3..] {
            assert_approx(*v, 2.0, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 14);
    }
}
