//! Multi-symbol signal scheduler.
//!
//! Runs one signal engine per configured symbol on an independent
//! fetch/evaluate/notify cycle and aggregates statistics across all
//! symbols on demand. A stalled or failing cycle for one symbol never
//! delays another: each symbol runs in its own task and owns its
//! engine exclusively.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::notify::{render_alert, MessageRef, Notifier};
use crate::services::engine::SignalEngine;
use crate::services::rsi::rsi;
use crate::sources::MarketData;
use crate::types::{CombinedStats, PositionStatus, SignalEvent, TradeStats};

/// Candles fetched per cycle; comfortably above any usable RSI window.
const CANDLE_FETCH_LIMIT: usize = 100;

/// Read-only view of one symbol's state, published by its own task
/// after every cycle. Reads concurrent with an in-flight close may see
/// pre-close values; aggregation is display-only.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: String,
    pub status: PositionStatus,
    pub entry_price: Option<f64>,
    pub stats: TradeStats,
}

/// Owns the per-symbol tasks and the aggregate statistics view.
pub struct Scheduler {
    config: Arc<Config>,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    snapshots: Arc<DashMap<String, SymbolSnapshot>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(
        config: Arc<Config>,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            market,
            notifier,
            snapshots: Arc::new(DashMap::new()),
            shutdown_tx,
        }
    }

    /// Spawn one cycle task per configured symbol and return their
    /// join handles. Tasks run until [`stop`](Self::stop) is called.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(
            "Scheduler starting {} symbol cycles (poll interval {:?}, cooldown {:?})",
            self.config.symbols.len(),
            self.config.effective_poll_interval(),
            self.config.effective_cooldown(),
        );

        self.config
            .symbols
            .iter()
            .map(|symbol| {
                let engine = SignalEngine::new(
                    symbol.clone(),
                    self.config.position_size,
                    self.config.leverage,
                    self.config.thresholds,
                    self.config.effective_cooldown(),
                );
                let task = SymbolTask {
                    symbol: symbol.clone(),
                    engine,
                    config: self.config.clone(),
                    market: self.market.clone(),
                    notifier: self.notifier.clone(),
                    snapshots: self.snapshots.clone(),
                };
                let shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(task.run(shutdown_rx))
            })
            .collect()
    }

    /// Request a cooperative stop of every symbol cycle. In-flight
    /// fetch and notify calls complete before the tasks exit.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Spawn the periodic aggregate statistics report.
    pub fn start_reporting(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = interval(scheduler.config.effective_report_interval());
            // The first interval tick completes immediately; there is
            // nothing to report yet.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => scheduler.log_combined_stats(),
                    _ = shutdown_rx.recv() => break,
                }
            }
        })
    }

    /// Point-in-time aggregate across all symbol snapshots.
    pub fn combined_stats(&self) -> CombinedStats {
        let mut combined = CombinedStats::default();

        for snapshot in self.snapshots.iter() {
            combined.total_trades += snapshot.stats.trade_count;
            combined.winning_trades += snapshot.stats.winning_trades;
            combined.total_pnl += snapshot.stats.total_pnl;
            if snapshot.status.is_open() {
                combined.open_positions += 1;
            }
        }

        combined
    }

    /// Log the aggregate statistics table across all pairs.
    pub fn log_combined_stats(&self) {
        let combined = self.combined_stats();

        info!("📊 Combined statistics across all pairs");
        info!("💰 Total PnL: ${:+.2}", combined.total_pnl);
        info!("📈 Total trades: {}", combined.total_trades);
        info!("🎯 Overall win rate: {:.1}%", combined.win_rate());
        info!("🔄 Open positions: {}", combined.open_positions);

        for snapshot in self.snapshots.iter() {
            let open = match (snapshot.status, snapshot.entry_price) {
                (status, Some(entry)) if status.is_open() => {
                    format!(" (holding {} from ${:.2})", status.label(), entry)
                }
                _ => String::new(),
            };
            info!(
                "  {}: {} trades | win {:.1}% | PnL ${:+.2}{}",
                snapshot.symbol,
                snapshot.stats.trade_count,
                snapshot.stats.win_rate(),
                snapshot.stats.total_pnl,
                open,
            );
        }
    }
}

/// One symbol's poll/evaluate/notify loop. The engine is owned by this
/// task alone; no other task ever touches it.
struct SymbolTask {
    symbol: String,
    engine: SignalEngine,
    config: Arc<Config>,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    snapshots: Arc<DashMap<String, SymbolSnapshot>>,
}

impl SymbolTask {
    async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("{}: signal cycle started", self.symbol);
        self.publish_snapshot();

        let mut ticker = interval(self.config.effective_poll_interval());

        loop {
            tokio::select! {
                _ = ticker.tick() => self.cycle().await,
                _ = shutdown_rx.recv() => {
                    info!("{}: signal cycle stopping", self.symbol);
                    break;
                }
            }
        }

        self.publish_snapshot();
    }

    /// One evaluation cycle. Any failure skips this cycle only.
    async fn cycle(&mut self) {
        let candles = match self
            .market
            .fetch_ohlcv(&self.symbol, self.config.timeframe, CANDLE_FETCH_LIMIT)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                warn!("{}: candle fetch failed, skipping cycle: {}", self.symbol, e);
                return;
            }
        };

        let price = match candles.last() {
            Some(candle) => candle.close,
            None => {
                warn!("{}: empty candle series, skipping cycle", self.symbol);
                return;
            }
        };

        let value = rsi(&candles, self.config.rsi_window);
        match value {
            Some(v) => info!("{}: RSI = {:.2}", self.symbol, v),
            None => debug!("{}: insufficient history for RSI, skipping", self.symbol),
        }

        if let Some(event) = self.engine.evaluate(value, price, Instant::now()) {
            self.dispatch(event).await;
        } else if self.engine.position().status.is_open() {
            debug!(
                "{}: holding {}, unrealized PnL ${:+.2}",
                self.symbol,
                self.engine.position().status.label(),
                self.engine.unrealized_pnl(price),
            );
        }

        let stats = self.engine.stats();
        if stats.trade_count > 0 {
            info!(
                "📊 {}: {} trades | win rate {:.1}% | total PnL ${:+.2}",
                self.symbol,
                stats.trade_count,
                stats.win_rate(),
                stats.total_pnl,
            );
        }

        self.publish_snapshot();
    }

    /// Forward a fired signal to the notifier. Delivery failure is
    /// logged; the state transition already happened and stands.
    async fn dispatch(&mut self, event: SignalEvent) {
        match (event.pnl, event.stats) {
            (Some(pnl), Some(stats)) => info!(
                target: "signals",
                "{} | {} | Entry: ${:.2} | Exit: ${:.2} | PnL: ${:+.2} | Total PnL: ${:+.2} | Win rate: {:.1}%",
                event.kind.label(),
                event.symbol,
                event.entry_price.unwrap_or(event.price),
                event.price,
                pnl,
                stats.total_pnl,
                stats.win_rate(),
            ),
            _ => info!(
                target: "signals",
                "{} | {} | Price: ${:.2} | RSI: {:.2} | Size: ${} | Leverage: x{}",
                event.kind.label(),
                event.symbol,
                event.price,
                event.rsi,
                event.size,
                event.leverage,
            ),
        }

        let text = render_alert(&event, self.config.rsi_window, self.config.thresholds);
        let reply_to = event.entry_message_id.map(MessageRef);

        match self.notifier.send(&text, reply_to).await {
            Ok(message) => {
                if !event.kind.is_exit() {
                    self.engine.record_entry_message(message.0);
                }
                info!("{}: delivered {} alert", self.symbol, event.kind.label());
            }
            Err(e) => warn!(
                "{}: {} alert delivery failed, state retained: {}",
                self.symbol,
                event.kind.label(),
                e,
            ),
        }
    }

    fn publish_snapshot(&self) {
        let position = self.engine.position();
        self.snapshots.insert(
            self.symbol.clone(),
            SymbolSnapshot {
                symbol: self.symbol.clone(),
                status: position.status,
                entry_price: position.entry_price,
                stats: self.engine.stats(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RsiThresholds, TelegramConfig};
    use crate::error::Result;
    use crate::types::{Candle, Timeframe};
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    struct EmptyMarket;

    impl MarketData for EmptyMarket {
        fn fetch_ohlcv<'a>(
            &'a self,
            _symbol: &'a str,
            _timeframe: Timeframe,
            _limit: usize,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    struct NullNotifier;

    impl Notifier for NullNotifier {
        fn send<'a>(
            &'a self,
            _text: &'a str,
            _reply_to: Option<MessageRef>,
        ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + 'a>> {
            Box::pin(async { Ok(MessageRef(1)) })
        }
    }

    fn test_config(symbols: &[&str]) -> Arc<Config> {
        Arc::new(Config {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            timeframe: Timeframe::OneHour,
            rsi_window: 14,
            thresholds: RsiThresholds::default(),
            position_size: 100.0,
            leverage: 20.0,
            cooldown: Duration::from_secs(3_600),
            poll_interval: Duration::from_secs(300),
            report_interval: Duration::from_secs(600),
            acceleration: 1.0,
            use_mock: false,
            binance_api_key: None,
            telegram: TelegramConfig {
                bot_token: "token".to_string(),
                chat_id: 1,
                thread_id: None,
                proxy_url: None,
            },
        })
    }

    fn scheduler(symbols: &[&str]) -> Scheduler {
        Scheduler::new(
            test_config(symbols),
            Arc::new(EmptyMarket),
            Arc::new(NullNotifier),
        )
    }

    fn snapshot(symbol: &str, trades: u64, wins: u64, pnl: f64, status: PositionStatus) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: symbol.to_string(),
            status,
            entry_price: status.is_open().then_some(100.0),
            stats: TradeStats {
                trade_count: trades,
                winning_trades: wins,
                total_pnl: pnl,
            },
        }
    }

    #[test]
    fn test_combined_stats_empty() {
        let scheduler = scheduler(&["BTC/USDT"]);
        let combined = scheduler.combined_stats();

        assert_eq!(combined.total_trades, 0);
        assert_eq!(combined.open_positions, 0);
        assert_eq!(combined.win_rate(), 0.0);
    }

    #[test]
    fn test_combined_stats_sums_across_symbols() {
        let scheduler = scheduler(&["BTC/USDT", "ETH/USDT", "SOL/USDT"]);
        scheduler.snapshots.insert(
            "BTC/USDT".to_string(),
            snapshot("BTC/USDT", 4, 3, 320.0, PositionStatus::Long),
        );
        scheduler.snapshots.insert(
            "ETH/USDT".to_string(),
            snapshot("ETH/USDT", 2, 0, -150.0, PositionStatus::Flat),
        );
        scheduler.snapshots.insert(
            "SOL/USDT".to_string(),
            snapshot("SOL/USDT", 0, 0, 0.0, PositionStatus::Short),
        );

        let combined = scheduler.combined_stats();
        assert_eq!(combined.total_trades, 6);
        assert_eq!(combined.winning_trades, 3);
        assert!((combined.total_pnl - 170.0).abs() < 1e-9);
        assert_eq!(combined.open_positions, 2);
        assert!((combined.win_rate() - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_start_spawns_one_task_per_symbol_and_stops() {
        let scheduler = scheduler(&["BTC/USDT", "ETH/USDT"]);
        let handles = scheduler.start();
        assert_eq!(handles.len(), 2);

        scheduler.stop();
        for handle in handles {
            handle.await.unwrap();
        }

        // Every task published a snapshot before exiting.
        assert_eq!(scheduler.snapshots.len(), 2);
    }
}
