//! Per-symbol signal state machine.
//!
//! Owns one symbol's position and trade statistics and decides, from
//! the latest RSI value, whether to open or close a position. The
//! engine performs no I/O: a fired transition is returned as a
//! [`SignalEvent`] for the caller to forward to the notifier.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::RsiThresholds;
use crate::types::{Position, PositionStatus, SignalEvent, SignalKind, TradeStats};

/// Signal state machine for a single symbol.
///
/// Mutated only through [`evaluate`](Self::evaluate) (and
/// [`record_entry_message`](Self::record_entry_message) after a
/// delivered entry alert); one instance is owned exclusively by its
/// symbol's scheduler task.
pub struct SignalEngine {
    position: Position,
    stats: TradeStats,
    thresholds: RsiThresholds,
    cooldown: Duration,
    last_signal_at: Option<Instant>,
}

impl SignalEngine {
    /// Create an engine with a flat position and empty statistics.
    ///
    /// `cooldown` is the effective (acceleration-scaled) minimum time
    /// between two signals for this symbol.
    pub fn new(
        symbol: impl Into<String>,
        size: f64,
        leverage: f64,
        thresholds: RsiThresholds,
        cooldown: Duration,
    ) -> Self {
        Self {
            position: Position::new(symbol, size, leverage),
            stats: TradeStats::default(),
            thresholds,
            cooldown,
            last_signal_at: None,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn stats(&self) -> TradeStats {
        self.stats
    }

    /// PnL of the open position at the given price; zero when flat.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.position.pnl_at(price)
    }

    /// Record the message id of the delivered entry alert so the exit
    /// alert can reply to it.
    pub fn record_entry_message(&mut self, message_id: i64) {
        if self.position.status.is_open() {
            self.position.entry_message_id = Some(message_id);
        }
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_signal_at {
            Some(last) => now.duration_since(last) > self.cooldown,
            None => true,
        }
    }

    /// Evaluate one cycle.
    ///
    /// `rsi` is the latest oscillator value, `None` when history was
    /// insufficient; `price` the latest close; `now` the evaluation
    /// instant used for cooldown arithmetic. At most one transition
    /// fires per call; the cooldown timer resets on every fired
    /// transition, entries and exits alike.
    pub fn evaluate(&mut self, rsi: Option<f64>, price: f64, now: Instant) -> Option<SignalEvent> {
        let rsi = rsi?;
        if rsi.is_nan() {
            return None;
        }
        if !self.cooldown_elapsed(now) {
            return None;
        }

        match self.position.status {
            PositionStatus::Long if rsi > self.thresholds.exit => {
                Some(self.close(SignalKind::ExitLong, rsi, price, now))
            }
            PositionStatus::Short if rsi < self.thresholds.exit => {
                Some(self.close(SignalKind::ExitShort, rsi, price, now))
            }
            PositionStatus::Flat if rsi < self.thresholds.oversold => {
                Some(self.open(SignalKind::EnterLong, PositionStatus::Long, rsi, price, now))
            }
            PositionStatus::Flat if rsi > self.thresholds.overbought => {
                Some(self.open(SignalKind::EnterShort, PositionStatus::Short, rsi, price, now))
            }
            _ => None,
        }
    }

    fn open(
        &mut self,
        kind: SignalKind,
        status: PositionStatus,
        rsi: f64,
        price: f64,
        now: Instant,
    ) -> SignalEvent {
        self.position.open(status, price, Utc::now());
        self.last_signal_at = Some(now);

        SignalEvent {
            kind,
            symbol: self.position.symbol.clone(),
            rsi,
            price,
            size: self.position.size,
            leverage: self.position.leverage,
            entry_price: None,
            pnl: None,
            stats: None,
            entry_message_id: None,
        }
    }

    fn close(&mut self, kind: SignalKind, rsi: f64, price: f64, now: Instant) -> SignalEvent {
        let entry_price = self.position.entry_price;
        let pnl = self.position.pnl_at(price);
        self.stats.record_close(pnl);
        let entry_message_id = self.position.close();
        self.last_signal_at = Some(now);

        SignalEvent {
            kind,
            symbol: self.position.symbol.clone(),
            rsi,
            price,
            size: self.position.size,
            leverage: self.position.leverage,
            entry_price,
            pnl: Some(pnl),
            stats: Some(self.stats),
            entry_message_id,
        }
    }
}
