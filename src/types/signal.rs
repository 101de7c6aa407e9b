use serde::{Deserialize, Serialize};

use crate::types::TradeStats;

/// Kind of an emitted trading signal.
///
/// A closed set, distinct from the position state: the just-fired
/// direction of an exit lives here, never in `PositionStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    EnterLong,
    EnterShort,
    ExitLong,
    ExitShort,
}

impl SignalKind {
    /// Tag used in the signal log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::EnterLong => "LONG_ENTRY",
            Self::EnterShort => "SHORT_ENTRY",
            Self::ExitLong => "LONG_EXIT",
            Self::ExitShort => "SHORT_EXIT",
        }
    }

    /// Whether this signal closes a position.
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::ExitLong | Self::ExitShort)
    }
}

/// A fired transition, produced by the signal engine and forwarded by
/// the scheduler to the notifier. The engine itself performs no I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub kind: SignalKind,
    pub symbol: String,
    /// Oscillator value that triggered the transition.
    pub rsi: f64,
    /// Latest price at evaluation time.
    pub price: f64,
    pub size: f64,
    pub leverage: f64,
    /// Present on exit signals.
    pub entry_price: Option<f64>,
    /// Realized PnL of the closed trade; present on exit signals.
    pub pnl: Option<f64>,
    /// Cumulative statistics after the close; present on exit signals.
    pub stats: Option<TradeStats>,
    /// Message id of the entry alert, for reply threading on exits.
    pub entry_message_id: Option<i64>,
}

/// Point-in-time aggregate across all scheduled symbols.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CombinedStats {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub total_pnl: f64,
    pub open_positions: usize,
}

impl CombinedStats {
    /// Overall win rate percentage, 0.0 when no trades have closed.
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            0.0
        } else {
            self.winning_trades as f64 / self.total_trades as f64 * 100.0
        }
    }
}
