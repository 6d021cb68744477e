//! Source fetcher trait and structured error types.
//!
//! The SourceFetcher trait abstracts over the upstream APIs (Binance,
//! blockchain.info, alternative.me, Yahoo/FRED) so the fetch pipeline can
//! run them uniformly and tests can substitute canned fetchers.

use crate::domain::time::floor_day;
use crate::domain::{DateRange, SourceId, TableError, TimeSeriesTable};
use chrono::NaiveDateTime;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("no data returned: {0}")]
    NoData(String),

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("store error: {0}")]
    StoreError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid table: {0}")]
    Table(#[from] TableError),

    #[error("no raw table for source '{source_id}', run `fetch {source_id}` first")]
    MissingTable { source_id: SourceId },
}

impl DataError {
    /// Transient failures are worth another attempt; schema and client
    /// errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::HttpStatus { status: 500..=599, .. }
                | DataError::HttpStatus { status: 408, .. }
        )
    }
}

/// Trait for source fetchers.
///
/// Implementations handle one upstream API. The store sits above this trait;
/// fetchers never touch the filesystem.
pub trait SourceFetcher: Send + Sync {
    /// Human-readable name of the upstream provider.
    fn name(&self) -> &str;

    /// Which raw table this fetcher produces.
    fn source_id(&self) -> SourceId;

    /// Fetch the source over `range` into a normalized, validated table.
    fn fetch(&self, range: &DateRange) -> Result<TimeSeriesTable, DataError>;

    /// Whether the provider is currently reachable (not blocked by the breaker).
    fn is_available(&self) -> bool;
}

/// Sort, deduplicate and validate a freshly fetched table.
pub fn finalize_table(table: TimeSeriesTable) -> Result<TimeSeriesTable, DataError> {
    let table = table.normalized();
    if table.is_empty() {
        return Err(DataError::Table(TableError::Empty));
    }
    table.validate()?;
    Ok(table)
}

/// Join daily point series on their day, forward-fill gaps per column and
/// trim to `range`.
pub fn assemble_daily(
    series: Vec<(String, Vec<(NaiveDateTime, f64)>)>,
    range: &DateRange,
) -> Result<TimeSeriesTable, DataError> {
    let mut table = TimeSeriesTable::outer_join(series);
    table.forward_fill();
    finalize_table(table.slice(floor_day(range.start), range.end))
}

/// Progress callback for multi-source fetches.
pub trait FetchProgress: Send {
    /// Called when starting to fetch a source.
    fn on_start(&self, source_id: SourceId, index: usize, total: usize);

    /// Called when a source fetch completes; `Ok` carries the row count written.
    fn on_complete(
        &self,
        source_id: SourceId,
        index: usize,
        total: usize,
        result: &Result<usize, DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, source_id: SourceId, index: usize, total: usize) {
        println!("[{}/{}] Fetching {source_id}...", index + 1, total);
    }

    fn on_complete(
        &self,
        source_id: SourceId,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(rows) => println!("  OK: {source_id} ({rows} rows)"),
            Err(e) => println!("  FAIL: {source_id}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nFetch complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}
