//! Binance trade stream: message parsing, reconnect backoff, and one blocking
//! websocket session.

use crate::domain::time::from_unix_millis;
use crate::domain::TradeTick;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tungstenite::Message;

pub const DEFAULT_STREAM_URL: &str = "wss://stream.binance.com:9443/ws/btcusdt@trade";

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("invalid stream url '{0}'")]
    InvalidUrl(String),

    #[error("websocket connect failed: {0}")]
    Connect(String),

    #[error("websocket read failed: {0}")]
    Read(String),

    #[error("stream closed by server")]
    Closed,

    #[error("unparseable trade message: {0}")]
    Parse(String),
}

impl ListenError {
    /// Errors that reconnecting cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ListenError::InvalidUrl(_))
    }
}

#[derive(Debug, Deserialize)]
struct TradeMessage {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "t")]
    trade_id: u64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    quantity: String,
    #[serde(rename = "T")]
    trade_time: i64,
    #[serde(rename = "m", default)]
    buyer_is_maker: bool,
}

/// Parse one text frame. `Ok(None)` for frames that are not trades
/// (subscription acks, other event types).
pub fn parse_trade_message(text: &str) -> Result<Option<TradeTick>, ListenError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ListenError::Parse(format!("{e}: {text}")))?;

    match value.get("e").and_then(Value::as_str) {
        Some("trade") => {}
        _ => return Ok(None),
    }

    let msg: TradeMessage =
        serde_json::from_value(value).map_err(|e| ListenError::Parse(format!("{e}: {text}")))?;

    let price: f64 = msg
        .price
        .parse()
        .map_err(|_| ListenError::Parse(format!("price {:?}", msg.price)))?;
    let quantity: f64 = msg
        .quantity
        .parse()
        .map_err(|_| ListenError::Parse(format!("quantity {:?}", msg.quantity)))?;
    let trade_time = from_unix_millis(msg.trade_time)
        .ok_or_else(|| ListenError::Parse(format!("trade time {}", msg.trade_time)))?;

    Ok(Some(TradeTick {
        symbol: msg.symbol,
        trade_id: msg.trade_id,
        price,
        quantity,
        trade_time,
        buyer_is_maker: msg.buyer_is_maker,
    }))
}

/// Receiver of normalized trades.
pub trait TradeSink {
    fn on_trade(&mut self, trade: &TradeTick);
}

/// Exponential reconnect delay with jitter, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Next delay: the current step scaled by a random factor in
    /// `[0.8, 1.2]`, never above `max`. Doubles the step for next time.
    pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let base = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        base.mul_f64(rng.gen_range(0.8..=1.2)).min(self.max)
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub messages: u64,
    pub trades: u64,
    pub skipped: u64,
}

/// How a connected session ended.
#[derive(Debug)]
pub struct SessionEnd {
    pub stats: SessionStats,
    pub reason: ListenError,
}

fn connect_error(url: &str, e: tungstenite::Error) -> ListenError {
    match e {
        tungstenite::Error::Url(_) | tungstenite::Error::HttpFormat(_) => {
            ListenError::InvalidUrl(url.to_string())
        }
        other => ListenError::Connect(other.to_string()),
    }
}

/// Connect once and forward trades to `sink` until the connection ends.
/// `Err` means the connection was never established.
pub fn run_session(url: &str, sink: &mut dyn TradeSink) -> Result<SessionEnd, ListenError> {
    let (mut socket, _response) = tungstenite::connect(url).map_err(|e| connect_error(url, e))?;
    info!(url, "trade stream connected");

    let mut stats = SessionStats::default();
    let reason = loop {
        let msg = match socket.read() {
            Ok(msg) => msg,
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                break ListenError::Closed
            }
            Err(e) => break ListenError::Read(e.to_string()),
        };
        stats.messages += 1;

        match msg {
            Message::Text(text) => match parse_trade_message(&text) {
                Ok(Some(trade)) => {
                    stats.trades += 1;
                    sink.on_trade(&trade);
                }
                Ok(None) => debug!("ignoring non-trade frame"),
                Err(e) => {
                    stats.skipped += 1;
                    warn!(error = %e, "skipping message");
                }
            },
            Message::Close(frame) => {
                debug!(?frame, "close frame received");
                break ListenError::Closed;
            }
            // pings are answered by tungstenite on the next read
            _ => {}
        }
    };

    Ok(SessionEnd { stats, reason })
}
