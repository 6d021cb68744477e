//! Raw data store: one CSV per source plus a JSON metadata sidecar.
//!
//! Layout: `{raw_dir}/{file}.csv` and `{raw_dir}/{file}.csv.meta.json`
//!
//! - Atomic writes (write to `.tmp`, rename into place)
//! - Validation before publish and on load
//! - Sidecar carries row count, range, columns and a BLAKE3 hash of the CSV

use super::csv_table::{read_csv, to_csv_bytes};
use super::provider::DataError;
use crate::domain::{SourceId, TimeSeriesTable};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Metadata sidecar for a stored table. Holds nothing time-dependent, so
/// rewriting identical data yields identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub file: String,
    pub rows: usize,
    pub columns: Vec<String>,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub content_hash: String,
}

/// `<file>.meta.json` next to `path`.
pub fn meta_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".meta.json");
    path.with_file_name(name)
}

/// Write `bytes` to `path` through a temporary sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            DataError::StoreError(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::StoreError(format!("write {}: {e}", tmp_path.display()))
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::StoreError(format!("atomic rename to {} failed: {e}", path.display()))
    })
}

/// Validate and publish a table as CSV with its sidecar.
pub fn write_table_file(
    path: &Path,
    name: &str,
    table: &TimeSeriesTable,
) -> Result<TableMeta, DataError> {
    table.validate()?;
    let bytes = to_csv_bytes(table)?;

    let meta = TableMeta {
        name: name.to_string(),
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        rows: table.len(),
        columns: table.column_names().map(str::to_string).collect(),
        first_timestamp: table.first_timestamp(),
        last_timestamp: table.last_timestamp(),
        content_hash: blake3::hash(&bytes).to_hex().to_string(),
    };
    let meta_json = serde_json::to_vec_pretty(&meta)
        .map_err(|e| DataError::StoreError(format!("meta serialization: {e}")))?;

    write_atomic(path, &bytes)?;
    write_atomic(&meta_path(path), &meta_json)?;
    debug!(path = %path.display(), rows = meta.rows, "table written");
    Ok(meta)
}

/// Load and validate a CSV table.
pub fn read_table_file(path: &Path) -> Result<TimeSeriesTable, DataError> {
    let file = fs::File::open(path)
        .map_err(|e| DataError::StoreError(format!("open {}: {e}", path.display())))?;
    let table = read_csv(std::io::BufReader::new(file)).map_err(|e| match e {
        DataError::ValidationError(msg) => {
            DataError::ValidationError(format!("{}: {msg}", path.display()))
        }
        other => other,
    })?;
    table.validate()?;
    Ok(table)
}

pub fn read_meta(path: &Path) -> Option<TableMeta> {
    let content = fs::read_to_string(meta_path(path)).ok()?;
    match serde_json::from_str(&content) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable metadata sidecar");
            None
        }
    }
}

/// Stored status of one source.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub source_id: SourceId,
    pub path: PathBuf,
    pub present: bool,
    pub size_bytes: Option<u64>,
    pub meta: Option<TableMeta>,
}

/// The raw data store.
pub struct RawStore {
    dir: PathBuf,
}

impl RawStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, source_id: SourceId) -> PathBuf {
        self.dir.join(source_id.file_name())
    }

    pub fn exists(&self, source_id: SourceId) -> bool {
        self.path(source_id).is_file()
    }

    /// Overwrite the table for `source_id`.
    pub fn write(
        &self,
        source_id: SourceId,
        table: &TimeSeriesTable,
    ) -> Result<TableMeta, DataError> {
        write_table_file(&self.path(source_id), source_id.name(), table)
    }

    /// Load the table for `source_id`; an absent file is `MissingTable`.
    pub fn read(&self, source_id: SourceId) -> Result<TimeSeriesTable, DataError> {
        let path = self.path(source_id);
        if !path.is_file() {
            return Err(DataError::MissingTable { source_id });
        }
        read_table_file(&path)
    }

    pub fn meta(&self, source_id: SourceId) -> Option<TableMeta> {
        read_meta(&self.path(source_id))
    }

    /// Whether the stored CSV still matches its sidecar hash. `None` when
    /// either file is missing.
    pub fn verify(&self, source_id: SourceId) -> Option<bool> {
        let meta = self.meta(source_id)?;
        let bytes = fs::read(self.path(source_id)).ok()?;
        Some(blake3::hash(&bytes).to_hex().as_str() == meta.content_hash)
    }

    pub fn status(&self) -> Vec<StoreStatus> {
        SourceId::ALL
            .iter()
            .map(|&source_id| {
                let path = self.path(source_id);
                let size_bytes = fs::metadata(&path).ok().map(|m| m.len());
                StoreStatus {
                    source_id,
                    present: size_bytes.is_some(),
                    size_bytes,
                    meta: self.meta(source_id),
                    path,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sentiment() -> TimeSeriesTable {
        TimeSeriesTable::from_columns(
            vec![day(1), day(2), day(3)],
            vec![("fear_greed_value", vec![39.0, 40.0, f64::NAN])],
        )
        .unwrap()
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());

        store.write(SourceId::Sentiment, &sentiment()).unwrap();
        let loaded = store.read(SourceId::Sentiment).unwrap();
        assert_eq!(loaded, sentiment());
        assert!(dir.path().join("sentiment_metrics.csv").is_file());
        assert!(dir.path().join("sentiment_metrics.csv.meta.json").is_file());
        assert!(!dir.path().join("sentiment_metrics.csv.tmp").exists());
    }

    #[test]
    fn missing_source_is_named() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());
        let err = store.read(SourceId::OnChain).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingTable {
                source_id: SourceId::OnChain
            }
        ));
    }

    #[test]
    fn meta_describes_table() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());
        store.write(SourceId::Sentiment, &sentiment()).unwrap();

        let meta = store.meta(SourceId::Sentiment).unwrap();
        assert_eq!(meta.name, "sentiment");
        assert_eq!(meta.rows, 3);
        assert_eq!(meta.columns, vec!["fear_greed_value".to_string()]);
        assert_eq!(meta.first_timestamp, Some(day(1)));
        assert_eq!(meta.last_timestamp, Some(day(3)));
        assert_eq!(store.verify(SourceId::Sentiment), Some(true));
    }

    #[test]
    fn rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());
        let path = store.path(SourceId::Sentiment);

        store.write(SourceId::Sentiment, &sentiment()).unwrap();
        let first = (fs::read(&path).unwrap(), fs::read(meta_path(&path)).unwrap());
        store.write(SourceId::Sentiment, &sentiment()).unwrap();
        let second = (fs::read(&path).unwrap(), fs::read(meta_path(&path)).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn unsorted_table_is_not_published() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());
        let bad = TimeSeriesTable::from_columns(
            vec![day(2), day(1)],
            vec![("fear_greed_value", vec![1.0, 2.0])],
        )
        .unwrap();
        assert!(store.write(SourceId::Sentiment, &bad).is_err());
        assert!(!store.exists(SourceId::Sentiment));
    }

    #[test]
    fn tampered_file_fails_verification() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());
        store.write(SourceId::Sentiment, &sentiment()).unwrap();
        fs::write(
            store.path(SourceId::Sentiment),
            "timestamp,fear_greed_value\n2020-01-01 00:00:00,1\n",
        )
        .unwrap();
        assert_eq!(store.verify(SourceId::Sentiment), Some(false));
    }

    #[test]
    fn status_lists_every_source() {
        let dir = TempDir::new().unwrap();
        let store = RawStore::new(dir.path());
        store.write(SourceId::Sentiment, &sentiment()).unwrap();

        let status = store.status();
        assert_eq!(status.len(), 4);
        let present: Vec<_> = status.iter().filter(|s| s.present).map(|s| s.source_id).collect();
        assert_eq!(present, vec![SourceId::Sentiment]);
    }
}
