use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Direction state of a symbol's exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    #[default]
    Flat,
    Long,
    Short,
}

impl PositionStatus {
    /// Whether a position is currently open.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Flat)
    }

    /// Get display label for this status.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flat => "FLAT",
            Self::Long => "LONG",
            Self::Short => "SHORT",
        }
    }
}

/// One symbol's directional exposure plus entry metadata.
///
/// Owned exclusively by that symbol's signal engine; entry fields are
/// present iff the position is open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub status: PositionStatus,
    pub entry_price: Option<f64>,
    pub entry_time: Option<DateTime<Utc>>,
    /// Message id of the alert that announced entry, reply target for
    /// the exit alert. Cleared when the position closes.
    pub entry_message_id: Option<i64>,
    /// Position size in quote currency (USD).
    pub size: f64,
    /// Leverage multiplier applied to the percentage price move.
    pub leverage: f64,
}

impl Position {
    /// Create a flat position for a symbol.
    pub fn new(symbol: impl Into<String>, size: f64, leverage: f64) -> Self {
        Self {
            symbol: symbol.into(),
            status: PositionStatus::Flat,
            entry_price: None,
            entry_time: None,
            entry_message_id: None,
            size,
            leverage,
        }
    }

    /// Open a position at the given price.
    pub fn open(&mut self, status: PositionStatus, price: f64, time: DateTime<Utc>) {
        self.status = status;
        self.entry_price = Some(price);
        self.entry_time = Some(time);
        self.entry_message_id = None;
    }

    /// Close the position, clearing all entry metadata. Returns the
    /// entry alert message id, if one was recorded.
    pub fn close(&mut self) -> Option<i64> {
        self.status = PositionStatus::Flat;
        self.entry_price = None;
        self.entry_time = None;
        self.entry_message_id.take()
    }

    /// Leverage-adjusted PnL in quote currency if the position were
    /// closed at `exit_price`. Zero when flat. A missing entry price on
    /// an open position indicates a bug; PnL is defined as 0.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        let entry = match self.entry_price {
            Some(p) => p,
            None => {
                if self.status.is_open() {
                    warn!(
                        "{}: open {} position has no recorded entry price, PnL defined as 0",
                        self.symbol,
                        self.status.label()
                    );
                }
                return 0.0;
            }
        };

        let pct_change = match self.status {
            PositionStatus::Long => (exit_price - entry) / entry,
            PositionStatus::Short => (entry - exit_price) / entry,
            PositionStatus::Flat => return 0.0,
        };

        self.size * pct_change * self.leverage
    }
}

/// Running statistics over closed trades for one symbol.
///
/// Monotonically accumulated, never reset during the process lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub trade_count: u64,
    pub winning_trades: u64,
    pub total_pnl: f64,
}

impl TradeStats {
    /// Record one closed trade.
    pub fn record_close(&mut self, pnl: f64) {
        self.trade_count += 1;
        if pnl > 0.0 {
            self.winning_trades += 1;
        }
        self.total_pnl += pnl;
    }

    /// Percentage of closed trades with positive PnL. 0.0 (never NaN)
    /// before the first close.
    pub fn win_rate(&self) -> f64 {
        if self.trade_count == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.trade_count as f64 * 100.0
        }
    }
}
