//! DeepBTC CLI: fetch raw data, build feature sets, listen to live trades.
//!
//! Commands:
//! - `fetch <source>`: fetch one source into the raw store
//! - `fetch-all`: fetch every source in order
//! - `features <basic|complete>`: build and publish a feature set
//! - `live`: log the Binance trade stream until interrupted
//! - `validate`: data-quality report over raw and feature files
//! - `status`: list stored tables from their metadata sidecars
//!
//! Exit codes: 0 success, 1 failure (including partial fetch-all failures and
//! validation problems), 2 usage errors.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deepbtc_core::data::store::read_meta;
use deepbtc_core::data::{RawStore, StdoutProgress, TableMeta};
use deepbtc_core::domain::SourceId;
use deepbtc_core::features::FeatureSet;
use deepbtc_runner::validate::{export_report_csv, render_markdown};
use deepbtc_runner::{
    fetch_all, fetch_one, run_features, run_listener, validate_data, FeatureStore, LogSink,
    PipelineConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "deepbtc",
    version,
    about = "DeepBTC: Bitcoin market, on-chain, sentiment and macro data pipeline"
)]
struct Cli {
    /// Path to a TOML pipeline config. Defaults are used when omitted.
    #[arg(long, global = true, env = "DEEPBTC_CONFIG")]
    config: Option<PathBuf>,

    /// Data root; overrides the config with `<dir>/raw` and `<dir>/features`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one source (market, onchain, sentiment, macro) into the raw store.
    Fetch {
        source: SourceId,
    },
    /// Fetch every source, one after another.
    FetchAll,
    /// Build a feature set (basic or complete) from the raw store.
    Features {
        set: FeatureSet,

        /// Also write a Parquet copy of the feature table.
        #[arg(long, default_value_t = false)]
        parquet: bool,
    },
    /// Log normalized trades from the live stream until interrupted.
    Live,
    /// Report data quality of raw and feature files.
    Validate {
        /// Print the report as JSON instead of Markdown.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Also write the report as CSV to this path.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List stored raw and feature tables.
    Status,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.set_data_dir(dir);
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let now = chrono::Utc::now().naive_utc();

    match cli.command {
        Commands::Fetch { source } => {
            let rows = fetch_one(&config, source, now, &StdoutProgress)?;
            info!(source = %source, rows, "fetch done");
            Ok(ExitCode::SUCCESS)
        }
        Commands::FetchAll => {
            let summary = fetch_all(&config, now, &StdoutProgress)?;
            if summary.all_succeeded() {
                return Ok(ExitCode::SUCCESS);
            }
            for (source_id, err) in &summary.errors {
                eprintln!("Error for {source_id}: {err}");
            }
            Ok(ExitCode::FAILURE)
        }
        Commands::Features { set, parquet } => {
            let mut config = config;
            config.data.write_parquet |= parquet;
            let out = run_features(&config, set)?;
            println!(
                "{set}: {} rows x {} columns ({} warmup rows), {} to {}",
                out.meta.rows,
                out.meta.columns.len(),
                out.warmup_rows,
                out.meta
                    .first_timestamp
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                out.meta
                    .last_timestamp
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
            );
            println!("Written: {}", out.csv_path.display());
            if let Some(path) = &out.parquet_path {
                println!("Written: {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Live => {
            let mut sink = LogSink::default();
            let summary = run_listener(&config.listener, &mut sink)?;
            info!(sessions = summary.sessions, trades = summary.trades, "listener stopped");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { json, csv } => {
            let report = validate_data(&config);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("failed to serialize report")?
                );
            } else {
                print!("{}", render_markdown(&report));
            }
            if let Some(path) = csv {
                let text = export_report_csv(&report)?;
                std::fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            Ok(if report.has_problems() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Status => {
            print_status(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_status(config: &PipelineConfig) {
    let raw = RawStore::new(&config.data.raw_dir);
    println!("Raw store: {}", raw.dir().display());
    println!(
        "{:<10} {:>8} {:<41} {:>10}  {}",
        "Source", "Rows", "Range", "Size", "Hash"
    );
    for status in raw.status() {
        if !status.present {
            println!("{:<10} {:>8}", status.source_id.name(), "missing");
            continue;
        }
        let verified = match raw.verify(status.source_id) {
            Some(true) => "ok",
            Some(false) => "MISMATCH",
            None => "-",
        };
        print_row(
            status.source_id.name(),
            status.meta.as_ref(),
            status.size_bytes.unwrap_or(0),
            verified,
        );
    }

    let features = FeatureStore::new(&config.data.features_dir);
    println!();
    println!("Feature store: {}", features.dir().display());
    for set in [FeatureSet::Basic, FeatureSet::Complete] {
        let path = features.csv_path(set);
        match std::fs::metadata(&path) {
            Ok(m) => print_row(set.name(), read_meta(&path).as_ref(), m.len(), "-"),
            Err(_) => println!("{:<10} {:>8}", set.name(), "missing"),
        }
        if features.parquet_path(set).is_file() {
            println!("{:<10} + parquet copy", "");
        }
    }
}

fn print_row(
    name: &str,
    meta: Option<&TableMeta>,
    size: u64,
    verified: &str,
) {
    let (rows, range) = match meta {
        Some(m) => (
            m.rows.to_string(),
            format!(
                "{} to {}",
                m.first_timestamp.map(|t| t.to_string()).unwrap_or_default(),
                m.last_timestamp.map(|t| t.to_string()).unwrap_or_default()
            ),
        ),
        None => ("?".into(), "(no meta)".into()),
    };
    println!(
        "{:<10} {:>8} {:<41} {:>10}  {}",
        name,
        rows,
        range,
        format_size(size),
        verified
    );
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}
