//! Synthetic market data for accelerated test runs.

use std::future::Future;
use std::pin::Pin;

use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::sources::MarketData;
use crate::types::{Candle, Timeframe};

/// Market regime used for one generated series.
#[derive(Debug, Clone, Copy)]
enum TrendRegime {
    Uptrend,
    Downtrend,
    Sideways,
    Volatile,
}

/// Synthetic random-walk candle source.
///
/// Each fetch generates a fresh series under a randomly chosen trend
/// regime, with occasional spikes in volatile markets so oversold and
/// overbought RSI readings actually occur.
pub struct MockMarket {
    starting_price: f64,
    volatility: f64,
}

impl MockMarket {
    pub fn new(starting_price: f64, volatility: f64) -> Self {
        Self {
            starting_price,
            volatility: volatility.max(1e-4),
        }
    }

    fn generate_closes<R: Rng>(&self, periods: usize, rng: &mut R) -> Vec<f64> {
        let regime = match rng.gen_range(0..4) {
            0 => TrendRegime::Uptrend,
            1 => TrendRegime::Downtrend,
            2 => TrendRegime::Sideways,
            _ => TrendRegime::Volatile,
        };
        debug!("Generating mock series with {:?} regime", regime);

        let drift = match regime {
            TrendRegime::Uptrend => 0.002,
            TrendRegime::Downtrend => -0.002,
            TrendRegime::Sideways | TrendRegime::Volatile => 0.0,
        };
        let sigma = match regime {
            TrendRegime::Volatile => self.volatility * 2.0,
            TrendRegime::Sideways => self.volatility / 2.0,
            _ => self.volatility,
        };

        let mut prices = Vec::with_capacity(periods);
        prices.push(self.starting_price);

        for i in 1..periods {
            let mut change = drift + rng.gen_range(-sigma..sigma);

            // Inject peaks and troughs so volatile series reach the
            // signal thresholds.
            if matches!(regime, TrendRegime::Volatile) && i % 20 == 0 {
                change = if rng.gen_bool(0.5) {
                    self.volatility * 3.0
                } else {
                    -self.volatility * 3.0
                };
            }

            let next = prices[i - 1] * (1.0 + change);
            prices.push(next.max(100.0));
        }

        prices
    }

    fn generate_candles(&self, timeframe: Timeframe, limit: usize) -> Vec<Candle> {
        let mut rng = rand::thread_rng();
        let closes = self.generate_closes(limit, &mut rng);

        let now = chrono::Utc::now().timestamp_millis();
        let step = timeframe.seconds() * 1_000;

        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let time = now - step * (limit as i64 - i as i64 - 1);
                let open = close * (1.0 + rng.gen_range(-0.005..0.005));
                let high = close.max(open) * (1.0 + rng.gen_range(0.0..0.01));
                let low = close.min(open) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = close * rng.gen_range(10.0..100.0);

                Candle {
                    time,
                    open,
                    high,
                    low,
                    close,
                    volume: Some(volume),
                }
            })
            .collect()
    }
}

impl MarketData for MockMarket {
    fn fetch_ohlcv<'a>(
        &'a self,
        _symbol: &'a str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>> {
        Box::pin(async move { Ok(self.generate_candles(timeframe, limit)) })
    }
}
