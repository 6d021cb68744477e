//! Feature engine: merges raw tables into one hourly feature table.
//!
//! 1. Technical columns from the market table alone, computed over the whole
//!    market history.
//! 2. (`complete` only) Each daily table is shifted by its publication lag,
//!    as-of joined onto the market axis, and its derived columns computed.
//! 3. The axis is truncated to the span every source in use covers.
//! 4. Leading rows without a full lookback are dropped or flagged.
//!
//! Target columns look into the future by construction and are excluded from
//! the warmup rule.

pub mod macroeconomic;
pub mod onchain;
pub mod sentiment;
pub mod targets;
pub mod technical;

pub use targets::{multiclass_bin, TARGET_COLUMNS};

use crate::data::align::{align_forward_fill, coverage, overlap, Coverage};
use crate::domain::{bars_from_table, SourceId, TableError, TimeSeriesTable};
use crate::indicators::series::{first_valid, sanitize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Named, fixed catalogue of feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSet {
    Basic,
    Complete,
}

impl FeatureSet {
    pub fn name(self) -> &'static str {
        match self {
            FeatureSet::Basic => "basic",
            FeatureSet::Complete => "complete",
        }
    }

    /// Raw tables this set reads, market first.
    pub fn required_sources(self) -> &'static [SourceId] {
        match self {
            FeatureSet::Basic => &[SourceId::Market],
            FeatureSet::Complete => &SourceId::ALL,
        }
    }

    pub fn file_stem(self) -> String {
        format!("btc_features_{}", self.name())
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(FeatureSet::Basic),
            "complete" => Ok(FeatureSet::Complete),
            other => Err(format!("unknown feature set '{other}' (expected basic or complete)")),
        }
    }
}

/// What to do with leading rows whose lookback windows are not yet full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPolicy {
    #[default]
    Drop,
    /// Keep every row and append a `warmup` column (1.0 / 0.0).
    Flag,
}

pub const WARMUP_COLUMN: &str = "warmup";

/// Default rolling window for BTC-vs-macro correlations: 30 days of hours.
pub const DEFAULT_CORRELATION_WINDOW: usize = 720;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureOptions {
    pub warmup: WarmupPolicy,
    pub correlation_window: usize,
    /// Hours each source's timestamps are pushed forward before alignment.
    pub lag_hours: BTreeMap<SourceId, i64>,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            warmup: WarmupPolicy::Drop,
            correlation_window: DEFAULT_CORRELATION_WINDOW,
            lag_hours: BTreeMap::new(),
        }
    }
}

impl FeatureOptions {
    pub fn lag_for(&self, source_id: SourceId) -> i64 {
        self.lag_hours.get(&source_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feature set '{set}' needs the '{source_id}' raw table, which is missing")]
    MissingSource { source_id: SourceId, set: FeatureSet },

    #[error("raw table '{source_id}' has no column '{column}'")]
    MissingColumn { source_id: SourceId, column: String },

    #[error("sources do not overlap in time: {0}")]
    EmptyOverlap(String),

    #[error("column '{column}' never fills its lookback in {rows} rows")]
    InsufficientHistory { column: String, rows: usize },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Output of [`build_features`].
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub set: FeatureSet,
    pub table: TimeSeriesTable,
    /// Span of the axis after overlap truncation, before warmup handling.
    pub span: Coverage,
    /// Rows dropped (or flagged) as warmup.
    pub warmup_rows: usize,
}

/// Columns computed for one source, in catalogue order.
pub(crate) type Columns = Vec<(String, Vec<f64>)>;

/// Build the feature table for `set` from raw tables keyed by source.
pub fn build_features(
    set: FeatureSet,
    sources: &BTreeMap<SourceId, TimeSeriesTable>,
    opts: &FeatureOptions,
) -> Result<FeatureTable, FeatureError> {
    for &source_id in set.required_sources() {
        let table = sources
            .get(&source_id)
            .ok_or(FeatureError::MissingSource { source_id, set })?;
        check_columns(source_id, table)?;
    }

    let market = sources
        .get(&SourceId::Market)
        .ok_or(FeatureError::MissingSource {
            source_id: SourceId::Market,
            set,
        })?;
    if market.is_empty() {
        return Err(TableError::Empty.into());
    }
    let bars = bars_from_table(market)?;
    let axis = market.timestamps();
    if opts.warmup == WarmupPolicy::Drop {
        let (column, lookback) = technical::longest_lookback();
        if bars.len() <= lookback {
            return Err(FeatureError::InsufficientHistory {
                column,
                rows: bars.len(),
            });
        }
    }

    let mut columns: Columns = technical::technical_columns(&bars);
    columns.extend(targets::target_columns(&bars));

    let mut coverages = Vec::new();
    coverages.extend(coverage(market, SourceId::Market.frequency()));

    if set == FeatureSet::Complete {
        let context = technical::MarketContext::new(&bars);
        for &source_id in &set.required_sources()[1..] {
            let raw = sources
                .get(&source_id)
                .ok_or(FeatureError::MissingSource { source_id, set })?;
            let shifted = required_subset(source_id, raw)?.shifted(opts.lag_for(source_id));
            let cov = coverage(&shifted, source_id.frequency()).ok_or_else(|| {
                FeatureError::EmptyOverlap(format!("'{source_id}' table is empty"))
            })?;
            coverages.push(cov);

            let aligned = align_forward_fill(axis, &shifted);
            let derived = match source_id {
                SourceId::OnChain => onchain::onchain_columns(&aligned)?,
                SourceId::Sentiment => sentiment::sentiment_columns(&aligned)?,
                SourceId::Macro => {
                    macroeconomic::macro_columns(&aligned, &context, opts.correlation_window)?
                }
                SourceId::Market => Vec::new(),
            };
            columns.extend(derived);
        }
    }

    let span = overlap(&coverages).ok_or_else(|| {
        let spans: Vec<String> = coverages
            .iter()
            .map(|c| format!("{}..{}", c.start, c.end))
            .collect();
        FeatureError::EmptyOverlap(spans.join(", "))
    })?;

    let mut full = TimeSeriesTable::new(axis.to_vec());
    for (name, mut values) in columns {
        sanitize(&mut values);
        full.push_column(name, values)?;
    }

    let table = full.slice(span.start, span.end);
    if table.len() < full.len() {
        debug!(
            set = %set,
            kept = table.len(),
            total = full.len(),
            start = %span.start,
            end = %span.end,
            "truncated to overlapping range"
        );
    }
    if table.is_empty() {
        return Err(FeatureError::EmptyOverlap(format!(
            "no market rows in {}..{}",
            span.start, span.end
        )));
    }

    let (table, warmup_rows) = apply_warmup(table, opts.warmup)?;
    info!(
        set = %set,
        rows = table.len(),
        columns = table.columns().len(),
        warmup_rows,
        "feature table built"
    );

    Ok(FeatureTable {
        set,
        table,
        span,
        warmup_rows,
    })
}

fn check_columns(source_id: SourceId, table: &TimeSeriesTable) -> Result<(), FeatureError> {
    for &column in source_id.required_columns() {
        if table.column(column).is_none() {
            return Err(FeatureError::MissingColumn {
                source_id,
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// The required columns of a raw table, in catalogue order. Extra columns
/// (FRED series in the macro table) stay out of the feature table.
fn required_subset(
    source_id: SourceId,
    table: &TimeSeriesTable,
) -> Result<TimeSeriesTable, FeatureError> {
    let mut subset = TimeSeriesTable::new(table.timestamps().to_vec());
    for &column in source_id.required_columns() {
        let values = table
            .column(column)
            .ok_or_else(|| FeatureError::MissingColumn {
                source_id,
                column: column.to_string(),
            })?;
        subset.push_column(column, values.to_vec())?;
    }
    Ok(subset)
}

pub fn is_target(column: &str) -> bool {
    TARGET_COLUMNS.contains(&column)
}

/// Index of the first row where every non-target column holds a value.
fn warmup_end(table: &TimeSeriesTable) -> Result<usize, FeatureError> {
    let mut end = 0;
    for series in table.columns().iter().filter(|c| !is_target(&c.name)) {
        match first_valid(&series.values) {
            Some(i) => end = end.max(i),
            None => {
                return Err(FeatureError::InsufficientHistory {
                    column: series.name.clone(),
                    rows: table.len(),
                })
            }
        }
    }
    Ok(end)
}

fn apply_warmup(
    table: TimeSeriesTable,
    policy: WarmupPolicy,
) -> Result<(TimeSeriesTable, usize), FeatureError> {
    match policy {
        WarmupPolicy::Drop => {
            let end = warmup_end(&table)?;
            if end > 0 {
                info!(rows = end, "dropping warmup rows");
            }
            Ok((table.skip_rows(end), end))
        }
        WarmupPolicy::Flag => {
            // a column that never fills flags every row
            let end = warmup_end(&table).unwrap_or(table.len());
            let flags = (0..table.len())
                .map(|i| if i < end { 1.0 } else { 0.0 })
                .collect();
            let mut table = table;
            table.push_column(WARMUP_COLUMN, flags)?;
            Ok((table, end))
        }
    }
}
