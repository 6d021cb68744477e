//! Column-major time-series table shared by every source and the feature engine.
//!
//! A table is a timestamp axis plus named `f64` columns of the same length.
//! Missing observations are `NaN`.

use super::time::format_timestamp;
use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeMap;
use thiserror::Error;

/// Structural errors on a [`TimeSeriesTable`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("timestamps not strictly increasing at row {row}: {previous} then {current}")]
    NotIncreasing {
        row: usize,
        previous: String,
        current: String,
    },

    #[error("table has no rows")]
    Empty,
}

/// One named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSeriesTable {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<Series>,
}

impl TimeSeriesTable {
    /// An axis with no columns yet.
    pub fn new(timestamps: Vec<NaiveDateTime>) -> Self {
        Self {
            timestamps,
            columns: Vec::new(),
        }
    }

    /// Build a table from an axis and `(name, values)` pairs.
    pub fn from_columns<S: Into<String>>(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<(S, Vec<f64>)>,
    ) -> Result<Self, TableError> {
        let mut table = Self::new(timestamps);
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Append a column. Rejects wrong lengths and duplicate names.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if values.len() != self.timestamps.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.timestamps.len(),
                actual: values.len(),
            });
        }
        if self.column(&name).is_some() {
            return Err(TableError::DuplicateColumn(name));
        }
        self.columns.push(Series { name, values });
        Ok(())
    }

    pub(crate) fn insert_column_unchecked(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.timestamps.len());
        self.columns.push(Series {
            name: name.to_string(),
            values,
        });
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Like [`column`](Self::column) but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<&[f64], TableError> {
        self.column(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Sort by timestamp and collapse duplicates, keeping the last
    /// observation seen for each timestamp.
    pub fn normalized(self) -> Self {
        let mut order: Vec<usize> = (0..self.timestamps.len()).collect();
        // stable: equal timestamps keep their arrival order
        order.sort_by_key(|&i| self.timestamps[i]);

        let mut keep: Vec<usize> = Vec::with_capacity(order.len());
        for i in order {
            if let Some(slot) = keep.last_mut() {
                if self.timestamps[*slot] == self.timestamps[i] {
                    *slot = i;
                    continue;
                }
            }
            keep.push(i);
        }
        self.take_rows(&keep)
    }

    /// Check the structural invariants: equal column lengths and strictly
    /// increasing timestamps.
    pub fn validate(&self) -> Result<(), TableError> {
        for column in &self.columns {
            if column.values.len() != self.timestamps.len() {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: self.timestamps.len(),
                    actual: column.values.len(),
                });
            }
        }
        for (row, pair) in self.timestamps.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TableError::NotIncreasing {
                    row: row + 1,
                    previous: format_timestamp(pair[0]),
                    current: format_timestamp(pair[1]),
                });
            }
        }
        Ok(())
    }

    /// Rows whose timestamp lies in `[start, end]`. Assumes sorted timestamps.
    pub fn slice(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let lo = self.timestamps.partition_point(|&t| t < start);
        let hi = self.timestamps.partition_point(|&t| t <= end);
        self.row_range(lo, hi.max(lo))
    }

    /// Drop the first `n` rows.
    pub fn skip_rows(&self, n: usize) -> Self {
        self.row_range(n.min(self.len()), self.len())
    }

    /// Shift every timestamp forward by `hours`.
    pub fn shifted(&self, hours: i64) -> Self {
        let delta = Duration::hours(hours);
        Self {
            timestamps: self.timestamps.iter().map(|&t| t + delta).collect(),
            columns: self.columns.clone(),
        }
    }

    /// Replace missing values with the last non-missing value above them.
    pub fn forward_fill(&mut self) {
        for column in &mut self.columns {
            let mut last = f64::NAN;
            for v in column.values.iter_mut() {
                if v.is_nan() {
                    *v = last;
                } else {
                    last = *v;
                }
            }
        }
    }

    /// Outer-join point series onto the union of their timestamps. Series
    /// keep the given column order; a later point for the same timestamp
    /// overwrites an earlier one.
    pub fn outer_join(series: Vec<(String, Vec<(NaiveDateTime, f64)>)>) -> Self {
        let mut rows: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
        let width = series.len();
        for (col, (_, points)) in series.iter().enumerate() {
            for &(ts, value) in points {
                rows.entry(ts).or_insert_with(|| vec![f64::NAN; width])[col] = value;
            }
        }

        let timestamps: Vec<NaiveDateTime> = rows.keys().copied().collect();
        let mut table = Self::new(timestamps);
        for (col, (name, _)) in series.iter().enumerate() {
            let values = rows.values().map(|row| row[col]).collect();
            table.insert_column_unchecked(name, values);
        }
        table
    }

    fn row_range(&self, lo: usize, hi: usize) -> Self {
        Self {
            timestamps: self.timestamps[lo..hi].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Series {
                    name: c.name.clone(),
                    values: c.values[lo..hi].to_vec(),
                })
                .collect(),
        }
    }

    fn take_rows(self, rows: &[usize]) -> Self {
        Self {
            timestamps: rows.iter().map(|&i| self.timestamps[i]).collect(),
            columns: self
                .columns
                .into_iter()
                .map(|c| Series {
                    values: rows.iter().map(|&i| c.values[i]).collect(),
                    name: c.name,
                })
                .collect(),
        }
    }
}

/// Values compare equal when both are NaN or bit-identical otherwise.
impl PartialEq for TimeSeriesTable {
    fn eq(&self, other: &Self) -> bool {
        self.timestamps == other.timestamps
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.name == b.name
                    && a.values.len() == b.values.len()
                    && a
                        .values
                        .iter()
                        .zip(&b.values)
                        .all(|(x, y)| (x.is_nan() && y.is_nan()) || x == y)
            })
    }
}
