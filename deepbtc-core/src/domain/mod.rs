//! Domain types for the DeepBTC pipeline

pub mod bar;
pub mod source;
pub mod table;
pub mod time;
pub mod trade;

pub use bar::{bars_from_table, bars_to_table, Bar, OHLCV_COLUMNS};
pub use source::{
    DateRange, Frequency, InvalidRange, ParseSourceError, SourceId, MACRO_COLUMNS,
    ONCHAIN_COLUMNS, SENTIMENT_COLUMNS,
};
pub use table::{Series, TableError, TimeSeriesTable};
pub use trade::TradeTick;
