use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::{AppError, Result};
use crate::types::Timeframe;

/// RSI thresholds for the long/short strategy.
#[derive(Debug, Clone, Copy)]
pub struct RsiThresholds {
    /// Open a long below this value.
    pub oversold: f64,
    /// Open a short above this value.
    pub overbought: f64,
    /// Close either side when RSI crosses back through this value.
    pub exit: f64,
}

impl Default for RsiThresholds {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
            exit: 50.0,
        }
    }
}

/// Telegram destination configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token.
    pub bot_token: String,
    /// Destination chat id.
    pub chat_id: i64,
    /// Forum topic thread id, when the destination is a topic.
    pub thread_id: Option<i64>,
    /// Optional proxy URL for the Bot API connection.
    pub proxy_url: Option<String>,
}

/// Application configuration, read once at startup and immutable
/// thereafter.
#[derive(Debug, Clone)]
pub struct Config {
    /// Trading pairs to monitor, e.g. "BTC/USDT".
    pub symbols: Vec<String>,
    /// Candle interval for RSI calculation.
    pub timeframe: Timeframe,
    /// RSI window in candles.
    pub rsi_window: usize,
    pub thresholds: RsiThresholds,
    /// Position size in quote currency (USD).
    pub position_size: f64,
    /// Leverage multiplier.
    pub leverage: f64,
    /// Base cooldown between signals for one symbol.
    pub cooldown: Duration,
    /// Base interval between evaluation cycles.
    pub poll_interval: Duration,
    /// Base interval between aggregate statistics reports.
    pub report_interval: Duration,
    /// Test-acceleration factor; 1 in real-time mode.
    pub acceleration: f64,
    /// Use the synthetic market data source instead of Binance.
    pub use_mock: bool,
    /// Binance API key (optional, klines work without).
    pub binance_api_key: Option<String>,
    pub telegram: TelegramConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails when the Telegram token or destination is missing or
    /// malformed; the process must not start scheduling without a
    /// valid notification destination.
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| AppError::Config("TELEGRAM_BOT_TOKEN is required".into()))?;
        let destination = env::var("TELEGRAM_CHAT_ID")
            .map_err(|_| AppError::Config("TELEGRAM_CHAT_ID is required".into()))?;
        let (chat_id, thread_id) = parse_destination(&destination)?;

        let symbols = parse_symbols(
            &env::var("TRADING_PAIRS")
                .unwrap_or_else(|_| "BTC/USDT,ETH/USDT,SOL/USDT,SUI/USDT".to_string()),
        );
        if symbols.is_empty() {
            return Err(AppError::Config("TRADING_PAIRS is empty".into()));
        }

        let timeframe_raw = env::var("RSI_TIMEFRAME").unwrap_or_else(|_| "1h".to_string());
        let timeframe = Timeframe::parse(&timeframe_raw).unwrap_or_else(|| {
            warn!("Unknown RSI_TIMEFRAME '{}', using 1h", timeframe_raw);
            Timeframe::OneHour
        });

        let use_mock = env::var("MOCK_DATA")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        // Acceleration only applies to mock runs; real-time mode is
        // pinned to a factor of 1.
        let acceleration = if use_mock {
            sanitize_acceleration(
                env::var("ACCELERATION_FACTOR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60.0),
            )
        } else {
            1.0
        };

        Ok(Self {
            symbols,
            timeframe,
            rsi_window: env::var("RSI_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(14),
            thresholds: RsiThresholds {
                oversold: env::var("RSI_OVERSOLD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30.0),
                overbought: env::var("RSI_OVERBOUGHT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(70.0),
                exit: env::var("RSI_EXIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50.0),
            },
            position_size: env::var("POSITION_SIZE_USD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100.0),
            leverage: env::var("LEVERAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20.0),
            cooldown: Duration::from_secs(
                env::var("SIGNAL_COOLDOWN_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3_600),
            ),
            poll_interval: Duration::from_secs(
                env::var("POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            report_interval: Duration::from_secs(
                env::var("REPORT_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(600),
            ),
            acceleration,
            use_mock,
            binance_api_key: env::var("BINANCE_API_KEY").ok(),
            telegram: TelegramConfig {
                bot_token,
                chat_id,
                thread_id,
                proxy_url: env::var("TELEGRAM_PROXY_URL").ok(),
            },
        })
    }

    /// Cooldown scaled by the acceleration factor.
    pub fn effective_cooldown(&self) -> Duration {
        self.cooldown.div_f64(self.acceleration)
    }

    /// Poll interval scaled by the acceleration factor.
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.div_f64(self.acceleration)
    }

    /// Report interval scaled by the acceleration factor.
    pub fn effective_report_interval(&self) -> Duration {
        self.report_interval.div_f64(self.acceleration)
    }
}

/// Split a comma-separated pair list, dropping empty entries.
fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a destination string of the form "CHAT_ID" or
/// "CHAT_ID_THREAD_ID" (forum topics).
fn parse_destination(raw: &str) -> Result<(i64, Option<i64>)> {
    let raw = raw.trim();

    if let Some((chat, thread)) = raw.split_once('_') {
        let chat_id = chat.parse().map_err(|_| {
            AppError::Config(format!("Invalid TELEGRAM_CHAT_ID chat part: {}", chat))
        })?;
        let thread_id = thread.parse().map_err(|_| {
            AppError::Config(format!("Invalid TELEGRAM_CHAT_ID thread part: {}", thread))
        })?;
        return Ok((chat_id, Some(thread_id)));
    }

    let chat_id = raw
        .parse()
        .map_err(|_| AppError::Config(format!("Invalid TELEGRAM_CHAT_ID: {}", raw)))?;
    Ok((chat_id, None))
}

/// Coerce an acceleration factor to a usable value. Zero, negative and
/// non-finite factors fall back to real-time.
fn sanitize_acceleration(factor: f64) -> f64 {
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        warn!(
            "Acceleration factor {} is not usable, falling back to real-time",
            factor
        );
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            symbols: vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()],
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
                chat_id: -100_123,
                thread_id: None,
                proxy_url: None,
            },
        }
    }

    // =========================================================================
    // Destination Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_plain_destination() {
        assert_eq!(parse_destination("123456").unwrap(), (123_456, None));
    }

    #[test]
    fn test_parse_negative_group_destination() {
        assert_eq!(
            parse_destination("-1001234567890").unwrap(),
            (-1_001_234_567_890, None)
        );
    }

    #[test]
    fn test_parse_threaded_destination() {
        assert_eq!(
            parse_destination("-1001234567890_42").unwrap(),
            (-1_001_234_567_890, Some(42))
        );
    }

    #[test]
    fn test_parse_invalid_destination() {
        assert!(parse_destination("not-a-chat").is_err());
        assert!(parse_destination("123_abc").is_err());
    }

    // =========================================================================
    // Symbol Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_symbols() {
        assert_eq!(
            parse_symbols("BTC/USDT, ETH/USDT ,SOL/USDT"),
            vec!["BTC/USDT", "ETH/USDT", "SOL/USDT"]
        );
    }

    #[test]
    fn test_parse_symbols_drops_empty_entries() {
        assert_eq!(parse_symbols("BTC/USDT,,"), vec!["BTC/USDT"]);
        assert!(parse_symbols("").is_empty());
    }

    // =========================================================================
    // Acceleration Tests
    // =========================================================================

    #[test]
    fn test_sanitize_acceleration_table() {
        let cases = [
            (60.0, 60.0),
            (1.0, 1.0),
            (0.5, 0.5),
            (0.0, 1.0),
            (-5.0, 1.0),
            (f64::NAN, 1.0),
            (f64::INFINITY, 1.0),
        ];
        for (input, expected) in cases {
            assert_eq!(sanitize_acceleration(input), expected, "factor {}", input);
        }
    }

    #[test]
    fn test_effective_durations_preserve_ratio() {
        let mut config = test_config();
        config.acceleration = 60.0;

        assert_eq!(config.effective_cooldown(), Duration::from_secs(60));
        assert_eq!(config.effective_poll_interval(), Duration::from_secs(5));

        // Ratio between poll interval and cooldown is unchanged.
        let base_ratio =
            config.cooldown.as_secs_f64() / config.poll_interval.as_secs_f64();
        let scaled_ratio = config.effective_cooldown().as_secs_f64()
            / config.effective_poll_interval().as_secs_f64();
        assert!((base_ratio - scaled_ratio).abs() < 1e-9);
    }

    #[test]
    fn test_real_time_effective_durations_unscaled() {
        let config = test_config();
        assert_eq!(config.effective_cooldown(), config.cooldown);
        assert_eq!(config.effective_poll_interval(), config.poll_interval);
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = RsiThresholds::default();
        assert_eq!(thresholds.oversold, 30.0);
        assert_eq!(thresholds.overbought, 70.0);
        assert_eq!(thresholds.exit, 50.0);
    }
}
