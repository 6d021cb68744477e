//! On-chain columns aligned to the hourly axis, plus their derived ratios.

use super::Columns;
use crate::domain::{TableError, TimeSeriesTable, ONCHAIN_COLUMNS};
use crate::indicators::series::pct_change;

const WEEK: usize = 24 * 7;

pub fn onchain_columns(aligned: &TimeSeriesTable) -> Result<Columns, TableError> {
    let mut columns: Columns = Vec::with_capacity(ONCHAIN_COLUMNS.len() + 5);
    for name in ONCHAIN_COLUMNS {
        columns.push((name.to_string(), aligned.require(name)?.to_vec()));
    }

    let price = aligned.require("market_price_usd")?;
    let supply = aligned.require("total_btc_supply")?;
    let tx_count = aligned.require("tx_count_daily")?;
    let fees = aligned.require("tx_fees_btc")?;

    for (derived, source) in [
        ("hash_rate_change_7d", "hash_rate_th_s"),
        ("difficulty_change_7d", "difficulty"),
        ("tx_count_change_7d", "tx_count_daily"),
    ] {
        columns.push((derived.into(), pct_change(aligned.require(source)?, WEEK)));
    }

    // network value over daily transaction count, in millions
    let nvt = (0..aligned.len())
        .map(|i| price[i] * supply[i] / (tx_count[i] * 1e6))
        .collect();
    columns.push(("nvt_ratio".into(), nvt));

    let revenue = fees.iter().zip(price).map(|(f, p)| f * p).collect();
    columns.push(("miner_revenue_usd".into(), revenue));
    Ok(columns)
}
