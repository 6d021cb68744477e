//! Data acquisition, raw storage and alignment

pub mod align;
pub mod binance;
pub mod blockchain;
pub mod circuit_breaker;
pub mod csv_table;
pub mod download;
pub mod fred;
pub mod http;
pub mod macro_data;
pub mod provider;
pub mod sentiment;
pub mod store;
pub mod stream;
pub mod yahoo;

pub use align::{align_forward_fill, coverage, overlap, Coverage};
pub use binance::BinanceKlines;
pub use blockchain::BlockchainCharts;
pub use circuit_breaker::CircuitBreaker;
pub use download::{fetch_source, fetch_sources, FetchSummary};
pub use http::{HttpClient, RetryPolicy};
pub use macro_data::MacroIndicators;
pub use provider::{DataError, FetchProgress, SourceFetcher, StdoutProgress};
pub use sentiment::FearGreedIndex;
pub use store::{RawStore, StoreStatus, TableMeta};
pub use stream::{Backoff, ListenError, TradeSink};
