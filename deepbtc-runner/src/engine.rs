//! Feature engine orchestration: load raw tables, build a feature set,
//! publish it to the feature store.

use crate::config::PipelineConfig;
use crate::feature_store::{FeatureOutput, FeatureStore};
use crate::pipeline::PipelineError;
use deepbtc_core::data::{DataError, RawStore};
use deepbtc_core::domain::{SourceId, TimeSeriesTable};
use deepbtc_core::features::{build_features, FeatureError, FeatureSet};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Read every raw table `set` needs. A missing file is reported with the
/// source it belongs to.
pub fn load_sources(
    store: &RawStore,
    set: FeatureSet,
) -> Result<BTreeMap<SourceId, TimeSeriesTable>, PipelineError> {
    let mut sources = BTreeMap::new();
    for &source_id in set.required_sources() {
        let table = store.read(source_id).map_err(|e| match e {
            DataError::MissingTable { source_id } => PipelineError::MissingInput { set, source_id },
            source => PipelineError::Data {
                operation: "load raw table",
                source,
            },
        })?;
        debug!(source = %source_id, rows = table.len(), "raw table loaded");
        sources.insert(source_id, table);
    }
    Ok(sources)
}

/// Compute `set` from the configured raw store and overwrite its output.
pub fn run_features(
    config: &PipelineConfig,
    set: FeatureSet,
) -> Result<FeatureOutput, PipelineError> {
    let options = config.to_feature_options()?;
    let raw = RawStore::new(&config.data.raw_dir);
    let sources = load_sources(&raw, set)?;

    let features = build_features(set, &sources, &options).map_err(|source| match source {
        FeatureError::MissingSource { source_id, set } => {
            PipelineError::MissingInput { set, source_id }
        }
        source => PipelineError::Feature { set, source },
    })?;

    let store = FeatureStore::new(&config.data.features_dir);
    let output = store.publish(&features, config.data.write_parquet)?;
    info!(
        set = %set,
        rows = output.meta.rows,
        warmup_rows = output.warmup_rows,
        start = %output.span.start,
        end = %output.span.end,
        "features complete"
    );
    Ok(output)
}
