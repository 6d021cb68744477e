//! Live trade listener: keeps one websocket session open at a time and
//! reconnects with capped, jittered exponential backoff.
//!
//! The loop never touches the raw store or the feature engine. It returns
//! only on a fatal error (a URL that can never connect) or when the optional
//! session limit is reached.

use crate::config::ListenerConfig;
use deepbtc_core::data::stream::{run_session, SessionEnd};
use deepbtc_core::data::{Backoff, ListenError, TradeSink};
use deepbtc_core::domain::TradeTick;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Sink that writes every normalized trade to the log.
#[derive(Debug, Default)]
pub struct LogSink {
    pub trades: u64,
}

impl TradeSink for LogSink {
    fn on_trade(&mut self, trade: &TradeTick) {
        self.trades += 1;
        info!(
            symbol = %trade.symbol,
            trade_id = trade.trade_id,
            price = trade.price,
            quantity = trade.quantity,
            notional = trade.notional(),
            side = trade.side(),
            time = %trade.trade_time,
            "trade"
        );
    }
}

/// Totals over every session of one listener run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenSummary {
    pub sessions: u64,
    pub failed_connects: u64,
    pub trades: u64,
    pub skipped: u64,
}

/// Reconnect loop over an injectable session function and sleeper.
///
/// The backoff is reset after any session that delivered at least one trade,
/// so a long healthy connection starts the next retry from the initial delay.
pub fn listen_with<S, Z, R>(
    url: &str,
    mut backoff: Backoff,
    sink: &mut dyn TradeSink,
    mut session: S,
    mut sleep: Z,
    rng: &mut R,
    max_sessions: Option<u64>,
) -> Result<ListenSummary, ListenError>
where
    S: FnMut(&str, &mut dyn TradeSink) -> Result<SessionEnd, ListenError>,
    Z: FnMut(Duration),
    R: Rng + ?Sized,
{
    let mut summary = ListenSummary::default();
    let mut attempts = 0u64;

    loop {
        attempts += 1;
        match session(url, &mut *sink) {
            Ok(end) => {
                summary.sessions += 1;
                summary.trades += end.stats.trades;
                summary.skipped += end.stats.skipped;
                if end.stats.trades > 0 {
                    backoff.reset();
                }
                warn!(
                    reason = %end.reason,
                    trades = end.stats.trades,
                    skipped = end.stats.skipped,
                    "trade stream disconnected"
                );
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                summary.failed_connects += 1;
                warn!(error = %e, "trade stream connect failed");
            }
        }

        if max_sessions.is_some_and(|max| attempts >= max) {
            return Ok(summary);
        }

        let delay = backoff.next_delay(rng);
        info!(delay_ms = delay.as_millis() as u64, "reconnecting");
        sleep(delay);
    }
}

/// Run the listener against the configured stream until a fatal error.
pub fn run_listener(
    config: &ListenerConfig,
    sink: &mut dyn TradeSink,
) -> Result<ListenSummary, ListenError> {
    let backoff = Backoff::new(
        Duration::from_millis(config.initial_backoff_ms),
        Duration::from_millis(config.max_backoff_ms),
    );
    info!(url = %config.url, "live listener starting");
    listen_with(
        &config.url,
        backoff,
        sink,
        run_session,
        std::thread::sleep,
        &mut rand::thread_rng(),
        None,
    )
}
