//! Outbound signal notification.

pub mod telegram;

pub use telegram::TelegramNotifier;

use std::future::Future;
use std::pin::Pin;

use crate::config::RsiThresholds;
use crate::error::Result;
use crate::types::{SignalEvent, SignalKind};

/// Opaque handle to a delivered notification, used to thread replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef(pub i64);

/// Capability to deliver a rendered alert to the configured
/// destination.
///
/// At-least-once, best effort: delivery failure never rolls back
/// trading state.
pub trait Notifier: Send + Sync {
    fn send<'a>(
        &'a self,
        text: &'a str,
        reply_to: Option<MessageRef>,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + 'a>>;
}

/// Render a signal event as the alert text for the destination.
pub fn render_alert(event: &SignalEvent, window: usize, thresholds: RsiThresholds) -> String {
    let coin = event.symbol.split('/').next().unwrap_or(&event.symbol);

    match event.kind {
        SignalKind::EnterLong => format!(
            "🚨 LONG SIGNAL: {} at ${:.2}\n\
             RSI ({}) = {:.2} < {} → oversold\n\
             👉 Recommendation: OPEN LONG\n\
             💰 Position: ${} at x{} leverage\n\
             🔄 Exit when RSI > {}",
            coin,
            event.price,
            window,
            event.rsi,
            thresholds.oversold,
            event.size,
            event.leverage,
            thresholds.exit,
        ),
        SignalKind::EnterShort => format!(
            "🚨 SHORT SIGNAL: {} at ${:.2}\n\
             RSI ({}) = {:.2} > {} → overbought\n\
             👉 Recommendation: OPEN SHORT\n\
             💰 Position: ${} at x{} leverage\n\
             🔄 Exit when RSI < {}",
            coin,
            event.price,
            window,
            event.rsi,
            thresholds.overbought,
            event.size,
            event.leverage,
            thresholds.exit,
        ),
        SignalKind::ExitLong | SignalKind::ExitShort => {
            let entry = event.entry_price.unwrap_or(event.price);
            let pnl = event.pnl.unwrap_or(0.0);
            let stats = event.stats.unwrap_or_default();
            let pnl_emoji = if pnl > 0.0 { "💚" } else { "❤️" };

            let (title, arrow, change_pct, comparison) = if event.kind == SignalKind::ExitLong {
                (
                    "EXIT LONG",
                    "📈",
                    (event.price - entry) / entry * 100.0,
                    format!("RSI ({}) = {:.2} > {}", window, event.rsi, thresholds.exit),
                )
            } else {
                (
                    "EXIT SHORT",
                    "📉",
                    (entry - event.price) / entry * 100.0,
                    format!("RSI ({}) = {:.2} < {}", window, event.rsi, thresholds.exit),
                )
            };

            format!(
                "🔔 {}: {}\n\
                 {} Entry: ${:.2} → Exit: ${:.2}\n\
                 📊 Price change: {:+.2}%\n\
                 {}\n\
                 👉 Recommendation: CLOSE POSITION\n\
                 {} Trade PnL: ${:+.2}\n\
                 💰 Total PnL: ${:+.2}\n\
                 📈 Trades: {} | Win rate: {:.1}%",
                title,
                coin,
                arrow,
                entry,
                event.price,
                change_pct,
                comparison,
                pnl_emoji,
                pnl,
                stats.total_pnl,
                stats.trade_count,
                stats.win_rate(),
            )
        }
    }
}
