//! On-Balance Volume. Starts at the first bar's volume and adds or subtracts
//! each bar's volume by the sign of the close change. No warmup.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Obv {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = Vec::with_capacity(bars.len());
        let Some(first) = bars.first() else {
            return out;
        };
        let mut running = first.volume;
        out.push(running);

        for pair in bars.windows(2) {
            let change = pair[1].close - pair[0].close;
            // a NaN close or volume holds the running total
            if !change.is_nan() && !pair[1].volume.is_nan() {
                if change > 0.0 {
                    running += pair[1].volume;
                } else if change < 0.0 {
                    running -= pair[1].volume;
                }
            }
            out.push(running);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn accumulates_by_direction() {
        let mut bars = make_bars(&[10.0, 11.0, 11.0, 9.0]);
        for (b, v) in bars.iter_mut().zip([100.0, 50.0, 70.0, 30.0]) {
            b.volume = v;
        }
        assert_eq!(Obv::new().compute(&bars), vec![100.0, 150.0, 150.0, 120.0]);
    }

    #[test]
    fn empty_input() {
        assert!(Obv::new().compute(&[]).is_empty());
    }
}
