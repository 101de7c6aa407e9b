use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil::config::Config;
use vigil::notify::TelegramNotifier;
use vigil::services::Scheduler;
use vigil::sources::{BinanceClient, MarketData, MockMarket};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil=info,signals=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; an invalid destination must stop the process
    // before any scheduling starts.
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("🚀 Starting Vigil signal bot");
    info!("📊 Pairs: {}", config.symbols.join(", "));
    info!(
        "⚙️  RSI: window={}, timeframe={}",
        config.rsi_window,
        config.timeframe.as_str()
    );
    info!(
        "📈 Thresholds: oversold<{}, overbought>{}, exit={}",
        config.thresholds.oversold, config.thresholds.overbought, config.thresholds.exit
    );
    info!(
        "💰 Position: ${} at x{} leverage",
        config.position_size, config.leverage
    );
    if config.use_mock {
        info!("🔧 Mode: mock data at x{} speed", config.acceleration);
    }

    // Select the market data source once at startup.
    let market: Arc<dyn MarketData> = if config.use_mock {
        Arc::new(MockMarket::new(20_000.0, 0.05))
    } else {
        Arc::new(BinanceClient::new(config.binance_api_key.clone()))
    };

    let notifier = Arc::new(TelegramNotifier::new(&config.telegram));
    notifier.log_chat_info().await;

    let scheduler = Arc::new(Scheduler::new(config, market, notifier));
    let handles = scheduler.start();
    let reporter = scheduler.start_reporting();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping symbol cycles");

    scheduler.stop();
    for handle in handles {
        let _ = handle.await;
    }
    let _ = reporter.await;

    scheduler.log_combined_stats();
    info!("🛑 Vigil stopped");

    Ok(())
}
