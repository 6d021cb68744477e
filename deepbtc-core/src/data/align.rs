//! Cross-frequency time alignment.
//!
//! Lower-frequency tables are mapped onto the hourly market axis with an
//! as-of join: each hour gets the latest non-missing observation at or before
//! it. Nothing from the future of an hour can reach that hour.

use crate::domain::{Frequency, TimeSeriesTable};
use chrono::{Duration, NaiveDateTime};

/// Inclusive span of the hourly axis a table can speak for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A daily table covers `[first day 00:00, last day 23:00]`; an hourly table
/// covers its own first and last timestamps.
pub fn coverage(table: &TimeSeriesTable, frequency: Frequency) -> Option<Coverage> {
    let start = table.first_timestamp()?;
    let last = table.last_timestamp()?;
    let end = last + frequency.period() - Duration::hours(1);
    Some(Coverage { start, end })
}

/// Intersection of several coverages, `None` when they do not overlap.
pub fn overlap(coverages: &[Coverage]) -> Option<Coverage> {
    let start = coverages.iter().map(|c| c.start).max()?;
    let end = coverages.iter().map(|c| c.end).min()?;
    (start <= end).then_some(Coverage { start, end })
}

/// As-of join of every column of `table` onto `axis`. Both must be sorted
/// ascending. Each column carries its own last non-missing value, so a gap in
/// one column does not blank the others.
pub fn align_forward_fill(axis: &[NaiveDateTime], table: &TimeSeriesTable) -> TimeSeriesTable {
    let source_ts = table.timestamps();
    let mut aligned = TimeSeriesTable::new(axis.to_vec());

    for column in table.columns() {
        let mut out = Vec::with_capacity(axis.len());
        let mut j = 0;
        let mut last = f64::NAN;
        for &t in axis {
            while j < source_ts.len() && source_ts[j] <= t {
                let v = column.values[j];
                if !v.is_nan() {
                    last = v;
                }
                j += 1;
            }
            out.push(last);
        }
        aligned.insert_column_unchecked(&column.name, out);
    }
    aligned
}
