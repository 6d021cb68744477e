//! Macro columns on the hourly axis and their correlation with BTC returns.
//!
//! Changes are taken hour over hour on the forward-filled series, so they are
//! zero except on the first hour a new daily close becomes known.

use super::technical::MarketContext;
use super::Columns;
use crate::domain::{TableError, TimeSeriesTable, MACRO_COLUMNS};
use crate::indicators::series::{pct_change, rolling_corr};

pub fn macro_columns(
    aligned: &TimeSeriesTable,
    market: &MarketContext,
    correlation_window: usize,
) -> Result<Columns, TableError> {
    let mut columns: Columns = Vec::with_capacity(MACRO_COLUMNS.len() + 7);
    for name in MACRO_COLUMNS {
        columns.push((name.to_string(), aligned.require(name)?.to_vec()));
    }

    let change = |name: &str| -> Result<Vec<f64>, TableError> {
        Ok(pct_change(aligned.require(name)?, 1))
    };
    let corr = |other: &[f64]| rolling_corr(&market.returns, other, correlation_window);

    let sp500_returns = change("SP500")?;
    let vix_change = change("VIX")?;
    let dxy_change = change("DXY")?;
    let gold_returns = change("GOLD")?;
    let btc_sp500 = corr(&sp500_returns);
    let btc_dxy = corr(&dxy_change);
    let btc_gold = corr(&gold_returns);

    columns.extend([
        ("sp500_returns".into(), sp500_returns),
        ("btc_sp500_correlation".into(), btc_sp500),
        ("vix_change".into(), vix_change),
        ("dxy_change".into(), dxy_change),
        ("btc_dxy_correlation".into(), btc_dxy),
        ("gold_returns".into(), gold_returns),
        ("btc_gold_correlation".into(), btc_gold),
    ]);
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn column_order_and_correlation() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + (i as f64).sin() * 3.0).collect();
        let bars = make_bars(&closes);
        let market = MarketContext::new(&bars);
        let axis = bars.iter().map(|b| b.timestamp).collect();
        let cols = MACRO_COLUMNS
            .iter()
            .map(|&c| {
                let values = match c {
                    "SP500" => closes.clone(),
                    "GOLD" => vec![1800.0; 12],
                    _ => (0..12).map(|i| if i % 2 == 0 { 5.0 } else { 6.0 }).collect(),
                };
                (c, values)
            })
            .collect();
        let table = TimeSeriesTable::from_columns(axis, cols).unwrap();
        let columns = macro_columns(&table, &market, 4).unwrap();

        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            [
                "SP500",
                "NASDAQ",
                "DXY",
                "GOLD",
                "VIX",
                "sp500_returns",
                "btc_sp500_correlation",
                "vix_change",
                "dxy_change",
                "btc_dxy_correlation",
                "gold_returns",
                "btc_gold_correlation",
            ]
        );
        let get = |name: &str| &columns.iter().find(|(n, _)| n == name).unwrap().1;

        // SP500 moving exactly with BTC
        assert!(get("btc_sp500_correlation")[3].is_nan());
        assert_approx(get("btc_sp500_correlation")[4], 1.0, 1e-9);
        // a flat series has no defined correlation
        assert!(get("btc_gold_correlation").iter().all(|v| v.is_nan()));
        assert_approx(get("vix_change")[1], 0.2, DEFAULT_EPSILON);
    }
}
