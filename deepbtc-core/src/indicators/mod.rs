//! Technical indicators over hourly bars.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each
//! one is computed once over the whole market table.
//!
//! Multi-series indicators (MACD, Bollinger, ADX, Stochastic) produce all of
//! their lines from one pass through `compute_lines`; `compute` yields the
//! first line only.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod obv;
pub mod rsi;
pub mod series;
pub mod sma;
pub mod stochastic;
pub mod vwap;
pub mod williams_r;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::Bollinger;
pub use cci::Cci;
pub use ema::Ema;
pub use macd::Macd;
pub use mfi::Mfi;
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::Stochastic;
pub use vwap::Vwap;
pub use williams_r::WilliamsR;

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead guard
/// No indicator value at bar t may depend on bar t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Column name of the first output line (e.g., "sma_20", "macd").
    fn name(&self) -> &str;

    /// Number of leading bars of the first line that are NaN on a gap-free
    /// series.
    fn lookback(&self) -> usize;

    /// Compute the first output line for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;

    /// Column name and lookback of every output line, in column order.
    fn lines(&self) -> Vec<(String, usize)> {
        vec![(self.name().to_string(), self.lookback())]
    }

    /// Every output line from one pass, in the order of [`Indicator::lines`].
    fn compute_lines(&self, bars: &[Bar]) -> Vec<Vec<f64>> {
        vec![self.compute(bars)]
    }
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic hourly bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
