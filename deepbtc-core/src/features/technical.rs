//! Market-only feature columns.

use super::Columns;
use crate::domain::Bar;
use crate::indicators::series::{log_returns, pct_change, ratio, rolling_mean, rolling_std};
use crate::indicators::{
    Adx, Atr, Bollinger, Cci, Ema, Indicator, Macd, Mfi, Obv, Rsi, Sma, Stochastic, Vwap, WilliamsR,
};

const DAY: usize = 24;
const WEEK: usize = 24 * 7;

/// Hourly close and close-to-close returns, shared with cross-source features.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub close: Vec<f64>,
    pub returns: Vec<f64>,
}

impl MarketContext {
    pub fn new(bars: &[Bar]) -> Self {
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let returns = pct_change(&close, 1);
        Self { close, returns }
    }
}

/// The indicator catalogue, in column order.
pub fn market_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Vwap::new()),
        Box::new(Sma::new(20)),
        Box::new(Sma::new(50)),
        Box::new(Sma::new(200)),
        Box::new(Ema::new(12)),
        Box::new(Ema::new(26)),
        Box::new(Macd::standard()),
        Box::new(Rsi::new(14)),
        Box::new(Rsi::new(21)),
        Box::new(Stochastic::new(14, 3, 3)),
        Box::new(Atr::new(14)),
        Box::new(Bollinger::new(20, 2.0)),
        Box::new(Adx::new(14)),
        Box::new(Cci::new(20)),
        Box::new(WilliamsR::new(14)),
        Box::new(Mfi::new(14)),
        Box::new(Obv::new()),
    ]
}

/// The catalogue line that fills last on a gap-free series, as
/// `(column, lookback)`. A history of `lookback` bars or fewer leaves that
/// column empty.
pub fn longest_lookback() -> (String, usize) {
    market_indicators()
        .iter()
        .flat_map(|indicator| indicator.lines())
        .chain([
            ("volatility_7d".to_string(), WEEK),
            ("price_momentum_7d".to_string(), WEEK),
        ])
        .max_by_key(|(_, lookback)| *lookback)
        .unwrap_or_default()
}

/// `a / b - 1`.
fn relative(a: &[f64], b: &[f64]) -> Vec<f64> {
    ratio(a, b).into_iter().map(|r| r - 1.0).collect()
}

/// Every non-target column of the `basic` set.
pub fn technical_columns(bars: &[Bar]) -> Columns {
    let ctx = MarketContext::new(bars);
    let pick = |f: fn(&Bar) -> f64| bars.iter().map(f).collect::<Vec<f64>>();
    let volume = pick(|b| b.volume);
    let volume_ma = rolling_mean(&volume, DAY);
    let volume_ratio = ratio(&volume, &volume_ma);

    let mut columns: Columns = vec![
        ("open".into(), pick(|b| b.open)),
        ("high".into(), pick(|b| b.high)),
        ("low".into(), pick(|b| b.low)),
        ("close".into(), ctx.close.clone()),
        ("volume".into(), volume.clone()),
        ("returns".into(), ctx.returns.clone()),
        ("log_returns".into(), log_returns(&ctx.close)),
        ("price_momentum_24h".into(), pct_change(&ctx.close, DAY)),
        ("price_momentum_7d".into(), pct_change(&ctx.close, WEEK)),
        ("volatility_24h".into(), rolling_std(&ctx.returns, DAY, 1)),
        ("volatility_7d".into(), rolling_std(&ctx.returns, WEEK, 1)),
        ("volume_ma_24h".into(), volume_ma),
        ("volume_ratio".into(), volume_ratio),
        ("volume_momentum".into(), pct_change(&volume, DAY)),
    ];

    let sma = |period: usize| rolling_mean(&ctx.close, period);
    let (sma20, sma50, sma200) = (sma(20), sma(50), sma(200));

    for indicator in market_indicators() {
        let lines = indicator.lines().into_iter().zip(indicator.compute_lines(bars));
        for ((name, _), values) in lines {
            debug_assert_eq!(values.len(), bars.len(), "indicator line '{name}'");
            columns.push((name, values));
        }
    }

    columns.push(("price_to_sma20".into(), relative(&ctx.close, &sma20)));
    columns.push(("price_to_sma50".into(), relative(&ctx.close, &sma50)));
    columns.push(("price_to_sma200".into(), relative(&ctx.close, &sma200)));
    columns.push(("sma50_to_sma200".into(), relative(&sma50, &sma200)));
    columns
}
