//! Integration tests for the fetch → raw store path using mock fetchers.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use deepbtc_core::data::{
    fetch_source, fetch_sources, DataError, FetchProgress, RawStore, SourceFetcher,
};
use deepbtc_core::domain::{DateRange, SourceId, TimeSeriesTable};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

fn day(d: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(d)
}

fn range() -> DateRange {
    DateRange::new(day(0), day(5)).unwrap()
}

enum Outcome {
    Table(TimeSeriesTable),
    RateLimited,
    Forbidden,
}

/// Returns a canned result and counts calls.
struct MockFetcher {
    source_id: SourceId,
    outcome: Outcome,
    calls: AtomicUsize,
    available: AtomicBool,
}

impl MockFetcher {
    fn new(source_id: SourceId, outcome: Outcome) -> Self {
        Self {
            source_id,
            outcome,
            calls: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }

    fn daily(source_id: SourceId) -> Self {
        let ts = (0..5).map(day).collect();
        let columns = source_id
            .required_columns()
            .iter()
            .map(|&c| (c, vec![1.5, 2.5, f64::NAN, 4.5, 5.5]))
            .collect();
        Self::new(
            source_id,
            Outcome::Table(TimeSeriesTable::from_columns(ts, columns).unwrap()),
        )
    }
}

impl SourceFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    fn source_id(&self) -> SourceId {
        self.source_id
    }

    fn fetch(&self, _range: &DateRange) -> Result<TimeSeriesTable, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Table(t) => Ok(t.clone()),
            Outcome::RateLimited => Err(DataError::RateLimited {
                retry_after_secs: 60,
            }),
            Outcome::Forbidden => {
                // a 403 trips the shared breaker
                self.available.store(false, Ordering::SeqCst);
                Err(DataError::CircuitBreakerTripped)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl FetchProgress for Recorder {
    fn on_start(&self, source_id: SourceId, index: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {source_id} {}/{total}", index + 1));
    }

    fn on_complete(
        &self,
        source_id: SourceId,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        let status = match result {
            Ok(rows) => format!("ok {rows}"),
            Err(_) => "err".to_string(),
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("done {source_id} {status}"));
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("batch {succeeded}/{failed}/{total}"));
    }
}

#[test]
fn fetch_source_publishes_table_and_sidecar() {
    let dir = TempDir::new().unwrap();
    let store = RawStore::new(dir.path());
    let fetcher = MockFetcher::daily(SourceId::Sentiment);

    let rows = fetch_source(&fetcher, &store, &range()).unwrap();
    assert_eq!(rows, 5);
    assert!(store.exists(SourceId::Sentiment));
    assert_eq!(store.verify(SourceId::Sentiment), Some(true));

    let back = store.read(SourceId::Sentiment).unwrap();
    match &fetcher.outcome {
        Outcome::Table(t) => assert_eq!(&back, t),
        _ => unreachable!(),
    }
}

#[test]
fn failed_stage_does_not_stop_the_pipeline() {
    let dir = TempDir::new().unwrap();
    let store = RawStore::new(dir.path());
    let onchain = MockFetcher::daily(SourceId::OnChain);
    let sentiment = MockFetcher::new(SourceId::Sentiment, Outcome::RateLimited);
    let macro_data = MockFetcher::daily(SourceId::Macro);
    let recorder = Recorder::default();

    let fetchers: Vec<&dyn SourceFetcher> = vec![&onchain, &sentiment, &macro_data];
    let summary = fetch_sources(&fetchers, &store, &range(), &recorder);

    assert_eq!(summary.total, 3);
    assert_eq!(
        summary.succeeded,
        vec![(SourceId::OnChain, 5), (SourceId::Macro, 5)]
    );
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.errors[0].0, SourceId::Sentiment);
    assert!(!store.exists(SourceId::Sentiment));

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.first().map(String::as_str), Some("start onchain 1/3"));
    assert_eq!(events.last().map(String::as_str), Some("batch 2/1/3"));
}

#[test]
fn tripped_breaker_skips_remaining_stages() {
    let dir = TempDir::new().unwrap();
    let store = RawStore::new(dir.path());
    let market = MockFetcher::new(SourceId::Market, Outcome::Forbidden);
    let onchain = MockFetcher::daily(SourceId::OnChain);
    let recorder = Recorder::default();

    let fetchers: Vec<&dyn SourceFetcher> = vec![&market, &onchain];
    let summary = fetch_sources(&fetchers, &store, &range(), &recorder);

    assert!(!summary.all_succeeded());
    assert_eq!(summary.failed(), 2);
    assert_eq!(onchain.calls.load(Ordering::SeqCst), 0);
    assert!(matches!(
        summary.errors[1],
        (SourceId::OnChain, DataError::CircuitBreakerTripped)
    ));
}

#[test]
fn overwrite_replaces_previous_table() {
    let dir = TempDir::new().unwrap();
    let store = RawStore::new(dir.path());
    let first = MockFetcher::daily(SourceId::Macro);
    fetch_source(&first, &store, &range()).unwrap();

    let ts = vec![day(0), day(1)];
    let columns = SourceId::Macro
        .required_columns()
        .iter()
        .map(|&c| (c, vec![9.0, 10.0]))
        .collect();
    let second = MockFetcher::new(
        SourceId::Macro,
        Outcome::Table(TimeSeriesTable::from_columns(ts, columns).unwrap()),
    );
    assert_eq!(fetch_source(&second, &store, &range()).unwrap(), 2);
    assert_eq!(store.read(SourceId::Macro).unwrap().len(), 2);
    assert_eq!(store.meta(SourceId::Macro).unwrap().rows, 2);

    // no temporary files left behind
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn missing_table_names_the_source() {
    let dir = TempDir::new().unwrap();
    let store = RawStore::new(dir.path());
    let err = store.read(SourceId::OnChain).unwrap_err();
    assert!(matches!(err, DataError::MissingTable { source_id: SourceId::OnChain }));
    assert!(err.to_string().contains("onchain"));
}
