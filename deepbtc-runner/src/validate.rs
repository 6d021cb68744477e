//! Data-quality report over the raw and feature stores.
//!
//! Reads every expected file leniently (duplicates and disorder are counted,
//! not rejected) and reports per file:
//! - rows, first/last timestamp, columns
//! - missing cells (total and per column), non-finite cells
//! - duplicate timestamps, out-of-order steps
//! - mean and largest spacing between timestamps
//! - whether the content still matches the hash in its metadata sidecar
//!
//! plus the range every raw source covers in common.

use crate::config::PipelineConfig;
use crate::feature_store::FeatureStore;
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use deepbtc_core::data::csv_table::read_csv;
use deepbtc_core::data::store::read_meta;
use deepbtc_core::data::{coverage, overlap, Coverage, RawStore};
use deepbtc_core::domain::{Frequency, SourceId, TimeSeriesTable};
use deepbtc_core::features::FeatureSet;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Missing-cell count for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub rows: usize,
    pub columns: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
    pub missing_cells: usize,
    /// Columns with at least one missing cell.
    pub missing_by_column: Vec<ColumnMissing>,
    pub non_finite_cells: usize,
    pub duplicate_timestamps: usize,
    pub out_of_order: usize,
    pub mean_spacing_secs: Option<f64>,
    pub max_gap_secs: Option<i64>,
    /// `None` when there is no sidecar to compare against.
    pub hash_ok: Option<bool>,
}

impl TableStats {
    pub fn has_problems(&self) -> bool {
        self.non_finite_cells > 0
            || self.duplicate_timestamps > 0
            || self.out_of_order > 0
            || self.hash_ok == Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    Missing,
    Unreadable { error: String },
    Loaded(TableStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileReport {
    pub fn stats(&self) -> Option<&TableStats> {
        match &self.status {
            FileStatus::Loaded(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn has_problems(&self) -> bool {
        match &self.status {
            FileStatus::Missing => false,
            FileStatus::Unreadable { .. } => true,
            FileStatus::Loaded(stats) => stats.has_problems(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub raw: Vec<FileReport>,
    pub features: Vec<FileReport>,
    /// Hourly range covered by every readable raw table.
    pub common_start: Option<NaiveDateTime>,
    pub common_end: Option<NaiveDateTime>,
}

impl ValidationReport {
    pub fn files(&self) -> impl Iterator<Item = &FileReport> {
        self.raw.iter().chain(&self.features)
    }

    pub fn has_problems(&self) -> bool {
        self.files().any(FileReport::has_problems)
    }
}

/// Statistics for an in-memory table.
pub fn table_stats(table: &TimeSeriesTable, hash_ok: Option<bool>) -> TableStats {
    let mut missing_cells = 0;
    let mut non_finite_cells = 0;
    let mut missing_by_column = Vec::new();
    for column in table.columns() {
        let missing = column.values.iter().filter(|v| v.is_nan()).count();
        non_finite_cells += column.values.iter().filter(|v| v.is_infinite()).count();
        missing_cells += missing;
        if missing > 0 {
            missing_by_column.push(ColumnMissing {
                column: column.name.clone(),
                missing,
            });
        }
    }

    let raw_ts = table.timestamps();
    let out_of_order = raw_ts.windows(2).filter(|w| w[1] < w[0]).count();

    let mut sorted = raw_ts.to_vec();
    sorted.sort_unstable();
    let before = sorted.len();
    sorted.dedup();
    let duplicate_timestamps = before - sorted.len();

    let (mean_spacing_secs, max_gap_secs) = match (sorted.first(), sorted.last()) {
        (Some(&first), Some(&last)) if sorted.len() > 1 => {
            let span = (last - first).num_seconds() as f64;
            let max_gap = sorted
                .windows(2)
                .map(|w| (w[1] - w[0]).num_seconds())
                .max();
            (Some(span / (sorted.len() - 1) as f64), max_gap)
        }
        _ => (None, None),
    };

    TableStats {
        rows: table.len(),
        columns: table.columns().len(),
        first: sorted.first().copied(),
        last: sorted.last().copied(),
        missing_cells,
        missing_by_column,
        non_finite_cells,
        duplicate_timestamps,
        out_of_order,
        mean_spacing_secs,
        max_gap_secs,
        hash_ok,
    }
}

fn read_lenient(path: &Path) -> std::result::Result<(TimeSeriesTable, Option<bool>), String> {
    let bytes = fs::read(path).map_err(|e| format!("read: {e}"))?;
    let table = read_csv(bytes.as_slice()).map_err(|e| e.to_string())?;
    let hash_ok = read_meta(path).map(|meta| blake3::hash(&bytes).to_hex().as_str() == meta.content_hash);
    Ok((table, hash_ok))
}

/// Inspect one CSV file.
pub fn inspect_file(name: &str, path: &Path) -> (FileReport, Option<TimeSeriesTable>) {
    let report = |status| FileReport {
        name: name.to_string(),
        path: path.to_path_buf(),
        status,
    };
    if !path.is_file() {
        return (report(FileStatus::Missing), None);
    }
    match read_lenient(path) {
        Ok((table, hash_ok)) => {
            let stats = table_stats(&table, hash_ok);
            (report(FileStatus::Loaded(stats)), Some(table))
        }
        Err(error) => {
            warn!(file = %path.display(), error = %error, "unreadable table");
            (report(FileStatus::Unreadable { error }), None)
        }
    }
}

/// Validate every raw and feature file the configuration points at.
pub fn validate_data(config: &PipelineConfig) -> ValidationReport {
    let raw_store = RawStore::new(&config.data.raw_dir);
    let mut raw = Vec::new();
    let mut coverages = Vec::new();
    for source_id in SourceId::ALL {
        let (report, table) = inspect_file(source_id.name(), &raw_store.path(source_id));
        if let Some(table) = table {
            coverages.extend(table_coverage(&table, source_id.frequency()));
        }
        raw.push(report);
    }

    let feature_store = FeatureStore::new(&config.data.features_dir);
    let features: Vec<FileReport> = [FeatureSet::Basic, FeatureSet::Complete]
        .into_iter()
        .map(|set| inspect_file(&set.file_stem(), &feature_store.csv_path(set)).0)
        .collect();

    // every source must be present for a common range to mean anything
    let common = if coverages.len() == SourceId::ALL.len() {
        overlap(&coverages)
    } else {
        None
    };

    let report = ValidationReport {
        raw,
        features,
        common_start: common.map(|c| c.start),
        common_end: common.map(|c| c.end),
    };
    info!(
        files = report.files().filter(|f| f.stats().is_some()).count(),
        problems = report.has_problems(),
        "validation finished"
    );
    report
}

fn table_coverage(table: &TimeSeriesTable, frequency: Frequency) -> Option<Coverage> {
    // coverage() reads first/last rows, which needs sorted input
    let sorted = table.clone().normalized();
    coverage(&sorted, frequency)
}

// ─── Rendering ──────────────────────────────────────────────────────

fn fmt_ts(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn fmt_hash(hash_ok: Option<bool>) -> &'static str {
    match hash_ok {
        Some(true) => "ok",
        Some(false) => "MISMATCH",
        None => "-",
    }
}

/// Markdown rendering of the report.
pub fn render_markdown(report: &ValidationReport) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Data Validation Report\n\n");

    for (title, files) in [("Raw tables", &report.raw), ("Feature tables", &report.features)] {
        md.push_str(&format!("## {title}\n\n"));
        md.push_str("| File | Rows | Cols | First | Last | Missing | Non-finite | Dups | Spacing (h) | Hash |\n");
        md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
        for file in files.iter() {
            match &file.status {
                FileStatus::Missing => md.push_str(&format!("| {} | *missing* |||||||||\n", file.name)),
                FileStatus::Unreadable { error } => {
                    md.push_str(&format!("| {} | **unreadable**: {error} |||||||||\n", file.name))
                }
                FileStatus::Loaded(s) => md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                    file.name,
                    s.rows,
                    s.columns,
                    fmt_ts(s.first),
                    fmt_ts(s.last),
                    s.missing_cells,
                    s.non_finite_cells,
                    s.duplicate_timestamps,
                    s.mean_spacing_secs
                        .map(|v| format!("{:.2}", v / 3600.0))
                        .unwrap_or_else(|| "-".into()),
                    fmt_hash(s.hash_ok),
                )),
            }
        }
        md.push('\n');
    }

    md.push_str("## Common range\n\n");
    match (report.common_start, report.common_end) {
        (Some(start), Some(end)) => {
            md.push_str(&format!("{} to {}\n", fmt_ts(Some(start)), fmt_ts(Some(end))))
        }
        _ => md.push_str("none (a raw table is missing or the sources do not overlap)\n"),
    }
    md
}

/// One row per file, flat columns for spreadsheets.
pub fn export_report_csv(report: &ValidationReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "name",
        "path",
        "status",
        "rows",
        "columns",
        "first",
        "last",
        "missing_cells",
        "non_finite_cells",
        "duplicate_timestamps",
        "out_of_order",
        "mean_spacing_secs",
        "max_gap_secs",
        "hash",
    ])?;

    for file in report.files() {
        let path = file.path.display().to_string();
        let mut row: Vec<String> = match &file.status {
            FileStatus::Missing => vec![file.name.clone(), path, "missing".into()],
            FileStatus::Unreadable { error } => {
                vec![file.name.clone(), path, format!("unreadable: {error}")]
            }
            FileStatus::Loaded(s) => vec![
                file.name.clone(),
                path,
                "ok".into(),
                s.rows.to_string(),
                s.columns.to_string(),
                fmt_ts(s.first),
                fmt_ts(s.last),
                s.missing_cells.to_string(),
                s.non_finite_cells.to_string(),
                s.duplicate_timestamps.to_string(),
                s.out_of_order.to_string(),
                s.mean_spacing_secs.map(|v| format!("{v:.1}")).unwrap_or_default(),
                s.max_gap_secs.map(|v| v.to_string()).unwrap_or_default(),
                fmt_hash(s.hash_ok).to_string(),
            ],
        };
        row.resize(14, String::new());
        wtr.write_record(&row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use deepbtc_core::domain::{MACRO_COLUMNS, ONCHAIN_COLUMNS, SENTIMENT_COLUMNS};
    use tempfile::TempDir;

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn daily(columns: &[&str], days: std::ops::Range<i64>) -> TimeSeriesTable {
        let ts: Vec<NaiveDateTime> = days.clone().map(|d| hour(24 * d)).collect();
        let cols = columns
            .iter()
            .map(|&c| (c, days.clone().map(|d| d as f64).collect()))
            .collect();
        TimeSeriesTable::from_columns(ts, cols).unwrap()
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.set_data_dir(dir);
        config
    }

    #[test]
    fn stats_count_problems() {
        let table = TimeSeriesTable::from_columns(
            vec![hour(0), hour(2), hour(1), hour(1)],
            vec![
                ("a", vec![1.0, f64::NAN, 3.0, 4.0]),
                ("b", vec![f64::INFINITY, 2.0, f64::NAN, f64::NAN]),
            ],
        )
        .unwrap();
        let stats = table_stats(&table, None);
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.missing_cells, 3);
        assert_eq!(
            stats.missing_by_column,
            vec![
                ColumnMissing { column: "a".into(), missing: 1 },
                ColumnMissing { column: "b".into(), missing: 2 },
            ]
        );
        assert_eq!(stats.non_finite_cells, 1);
        assert_eq!(stats.duplicate_timestamps, 1);
        assert_eq!(stats.out_of_order, 1);
        assert_eq!(stats.first, Some(hour(0)));
        assert_eq!(stats.last, Some(hour(2)));
        assert_eq!(stats.mean_spacing_secs, Some(3600.0));
        assert!(stats.has_problems());
    }

    #[test]
    fn clean_store_reports_common_range() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let store = RawStore::new(&config.data.raw_dir);

        let market = TimeSeriesTable::from_columns(
            (0..24 * 5).map(hour).collect(),
            ["open", "high", "low", "close", "volume"]
                .iter()
                .map(|&c| (c, vec![1.0; 24 * 5]))
                .collect(),
        )
        .unwrap();
        store.write(SourceId::Market, &market).unwrap();
        store.write(SourceId::OnChain, &daily(&ONCHAIN_COLUMNS, 1..5)).unwrap();
        store.write(SourceId::Sentiment, &daily(&SENTIMENT_COLUMNS, 0..3)).unwrap();
        store.write(SourceId::Macro, &daily(&MACRO_COLUMNS, 0..5)).unwrap();

        let report = validate_data(&config);
        assert!(!report.has_problems());
        assert!(report.raw.iter().all(|f| f.stats().unwrap().hash_ok == Some(true)));
        assert!(report.features.iter().all(|f| f.status == FileStatus::Missing));
        // onchain starts on day 1, sentiment ends after day 2
        assert_eq!(report.common_start, Some(hour(24)));
        assert_eq!(report.common_end, Some(hour(24 * 3 - 1)));

        let md = render_markdown(&report);
        assert!(md.contains("| market | 120 |"));
        assert!(md.contains("btc_features_basic | *missing*"));
    }

    #[test]
    fn tampered_file_fails_hash_check() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let store = RawStore::new(&config.data.raw_dir);
        store.write(SourceId::Sentiment, &daily(&SENTIMENT_COLUMNS, 0..3)).unwrap();

        let path = store.path(SourceId::Sentiment);
        let mut text = fs::read_to_string(&path).unwrap();
        text.push_str("2022-02-04 00:00:00,9\n");
        fs::write(&path, text).unwrap();

        let report = validate_data(&config);
        let sentiment = &report.raw[SourceId::ALL.iter().position(|&s| s == SourceId::Sentiment).unwrap()];
        assert_eq!(sentiment.stats().unwrap().hash_ok, Some(false));
        assert!(report.has_problems());
        assert_eq!(report.common_start, None);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let store = RawStore::new(&config.data.raw_dir);
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(SourceId::Macro), "date,SP500\nnot-a-date,1\n").unwrap();

        let report = validate_data(&config);
        let status = &report.raw[3].status;
        assert!(matches!(status, FileStatus::Unreadable { .. }));
        assert!(report.has_problems());
    }

    #[test]
    fn csv_export_has_one_row_per_file() {
        let dir = TempDir::new().unwrap();
        let report = validate_data(&config_in(dir.path()));
        let csv = export_report_csv(&report).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + SourceId::ALL.len() + 2);
        assert!(lines[0].starts_with("name,path,status,rows"));
        assert!(lines[1].starts_with("market,"));
        assert!(lines[1].contains(",missing,"));
    }
}
