//! Feature store: publishes computed feature tables.
//!
//! Layout: `{features_dir}/btc_features_{set}.csv` with a `.meta.json`
//! sidecar, plus an optional `btc_features_{set}.parquet` copy holding a
//! `timestamp_ms` (i64) column followed by one f64 column per feature.
//!
//! Both files are written through a temporary sibling and renamed into place.

use crate::pipeline::PipelineError;
use deepbtc_core::data::store::{read_table_file, write_atomic, write_table_file};
use deepbtc_core::data::{Coverage, DataError, TableMeta};
use deepbtc_core::domain::time::{from_unix_millis, to_unix_millis};
use deepbtc_core::domain::TimeSeriesTable;
use deepbtc_core::features::{FeatureSet, FeatureTable};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const TIMESTAMP_MS_COLUMN: &str = "timestamp_ms";

/// What a publish wrote.
#[derive(Debug, Clone)]
pub struct FeatureOutput {
    pub set: FeatureSet,
    pub csv_path: PathBuf,
    pub parquet_path: Option<PathBuf>,
    pub meta: TableMeta,
    pub span: Coverage,
    pub warmup_rows: usize,
}

pub struct FeatureStore {
    dir: PathBuf,
}

impl FeatureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn csv_path(&self, set: FeatureSet) -> PathBuf {
        self.dir.join(format!("{}.csv", set.file_stem()))
    }

    pub fn parquet_path(&self, set: FeatureSet) -> PathBuf {
        self.dir.join(format!("{}.parquet", set.file_stem()))
    }

    /// Overwrite the feature files for `features.set`. A Parquet copy left by
    /// an earlier run is removed when `parquet` is off, so the two files never
    /// disagree.
    pub fn publish(
        &self,
        features: &FeatureTable,
        parquet: bool,
    ) -> Result<FeatureOutput, PipelineError> {
        let set = features.set;
        let csv_path = self.csv_path(set);
        let meta = write_table_file(&csv_path, &set.file_stem(), &features.table).map_err(
            |source| PipelineError::Data {
                operation: "publish feature table",
                source,
            },
        )?;

        let parquet_path = self.parquet_path(set);
        let parquet_path = if parquet {
            write_parquet(&parquet_path, &features.table)?;
            Some(parquet_path)
        } else {
            if parquet_path.is_file() {
                fs::remove_file(&parquet_path).map_err(|e| PipelineError::Parquet {
                    path: parquet_path.clone(),
                    message: format!("remove stale copy: {e}"),
                })?;
                debug!(path = %parquet_path.display(), "stale parquet copy removed");
            }
            None
        };

        info!(
            set = %set,
            rows = meta.rows,
            columns = meta.columns.len(),
            path = %csv_path.display(),
            "feature table published"
        );

        Ok(FeatureOutput {
            set,
            csv_path,
            parquet_path,
            meta,
            span: features.span,
            warmup_rows: features.warmup_rows,
        })
    }

    pub fn read(&self, set: FeatureSet) -> Result<TimeSeriesTable, PipelineError> {
        read_table_file(&self.csv_path(set)).map_err(|source| PipelineError::Data {
            operation: "read feature table",
            source,
        })
    }

    pub fn read_parquet(&self, set: FeatureSet) -> Result<TimeSeriesTable, PipelineError> {
        read_parquet(&self.parquet_path(set))
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert a table to a DataFrame: `timestamp_ms` then every value column.
pub fn table_to_dataframe(table: &TimeSeriesTable) -> PolarsResult<DataFrame> {
    let millis: Vec<i64> = table.timestamps().iter().map(|&t| to_unix_millis(t)).collect();

    let mut columns = Vec::with_capacity(table.columns().len() + 1);
    columns.push(Column::new(TIMESTAMP_MS_COLUMN.into(), millis));
    for series in table.columns() {
        columns.push(Column::new(series.name.as_str().into(), series.values.clone()));
    }
    DataFrame::new(columns)
}

/// Convert a DataFrame written by [`table_to_dataframe`] back to a table.
/// Nulls read as missing values.
pub fn dataframe_to_table(df: &DataFrame) -> Result<TimeSeriesTable, String> {
    let ts_col = df
        .column(TIMESTAMP_MS_COLUMN)
        .map_err(|e| format!("column read: {e}"))?;
    let ts_ca = ts_col
        .i64()
        .map_err(|e| format!("{TIMESTAMP_MS_COLUMN} column type: {e}"))?;

    let mut timestamps = Vec::with_capacity(df.height());
    for (i, ms) in ts_ca.into_iter().enumerate() {
        let ts = ms
            .and_then(from_unix_millis)
            .ok_or_else(|| format!("row {i}: invalid {TIMESTAMP_MS_COLUMN}"))?;
        timestamps.push(ts);
    }

    let mut columns = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == TIMESTAMP_MS_COLUMN {
            continue;
        }
        let ca = column
            .f64()
            .map_err(|e| format!("{name} column type: {e}"))?;
        let values: Vec<f64> = ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        columns.push((name.to_string(), values));
    }

    TimeSeriesTable::from_columns(timestamps, columns).map_err(|e| e.to_string())
}

/// Write `table` as Parquet to `path` atomically.
pub fn write_parquet(path: &Path, table: &TimeSeriesTable) -> Result<(), PipelineError> {
    let parquet_err = |message: String| PipelineError::Parquet {
        path: path.to_path_buf(),
        message,
    };

    let mut df = table_to_dataframe(table).map_err(|e| parquet_err(format!("dataframe creation: {e}")))?;
    let mut buf: Vec<u8> = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| parquet_err(format!("write parquet: {e}")))?;

    write_atomic(path, &buf).map_err(|e: DataError| parquet_err(e.to_string()))?;
    debug!(path = %path.display(), rows = table.len(), bytes = buf.len(), "parquet written");
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<TimeSeriesTable, PipelineError> {
    let parquet_err = |message: String| PipelineError::Parquet {
        path: path.to_path_buf(),
        message,
    };

    let file = fs::File::open(path).map_err(|e| parquet_err(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| parquet_err(format!("read: {e}")))?;
    let table = dataframe_to_table(&df).map_err(parquet_err)?;
    table.validate().map_err(|e| parquet_err(e.to_string()))?;
    Ok(table)
}
