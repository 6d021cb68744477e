//! Trade: one normalized trade from the live stream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTick {
    pub symbol: String,
    pub trade_id: u64,
    pub price: f64,
    pub quantity: f64,
    /// Exchange trade time (UTC, millisecond precision).
    pub trade_time: NaiveDateTime,
    pub buyer_is_maker: bool,
}

impl TradeTick {
    /// Quote-currency value of the trade.
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// `"buy"` when the aggressor bought, `"sell"` otherwise.
    pub fn side(&self) -> &'static str {
        if self.buyer_is_maker {
            "sell"
        } else {
            "buy"
        }
    }
}
