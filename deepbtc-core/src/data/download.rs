//! Fetch orchestrator: runs source fetchers one after another and publishes
//! each result to the raw store, with progress reporting.

use super::provider::{DataError, FetchProgress, SourceFetcher};
use super::store::RawStore;
use crate::domain::{DateRange, SourceId};
use tracing::{error, info};

/// Fetch `source` and overwrite its raw table. Returns the row count written.
pub fn fetch_source(
    fetcher: &dyn SourceFetcher,
    store: &RawStore,
    range: &DateRange,
) -> Result<usize, DataError> {
    let table = fetcher.fetch(range)?;
    let meta = store.write(fetcher.source_id(), &table)?;
    info!(
        source = %fetcher.source_id(),
        provider = fetcher.name(),
        rows = meta.rows,
        "raw table published"
    );
    Ok(meta.rows)
}

/// Run every fetcher in order. A failure is recorded and the next stage still
/// runs, unless the shared circuit breaker has tripped, in which case the
/// remaining stages are failed without a request.
pub fn fetch_sources(
    fetchers: &[&dyn SourceFetcher],
    store: &RawStore,
    range: &DateRange,
    progress: &dyn FetchProgress,
) -> FetchSummary {
    let total = fetchers.len();
    let mut succeeded = Vec::new();
    let mut errors: Vec<(SourceId, DataError)> = Vec::new();

    for (i, fetcher) in fetchers.iter().enumerate() {
        let source_id = fetcher.source_id();
        progress.on_start(source_id, i, total);

        let result = fetch_source(*fetcher, store, range);
        progress.on_complete(source_id, i, total, &result);

        match result {
            Ok(rows) => succeeded.push((source_id, rows)),
            Err(e) => {
                error!(source = %source_id, error = %e, "fetch failed");
                errors.push((source_id, e));
            }
        }

        if !fetcher.is_available() {
            for rest in &fetchers[(i + 1)..] {
                errors.push((rest.source_id(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    progress.on_batch_complete(succeeded.len(), errors.len(), total);

    FetchSummary {
        total,
        succeeded,
        errors,
    }
}

/// Summary of a batch fetch.
#[derive(Debug)]
pub struct FetchSummary {
    pub total: usize,
    pub succeeded: Vec<(SourceId, usize)>,
    pub errors: Vec<(SourceId, DataError)>,
}

impl FetchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}
