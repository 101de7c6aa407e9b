use std::future::Future;
use std::pin::Pin;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::sources::MarketData;
use crate::types::{Candle, Timeframe};

const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// One kline row from the Binance REST API.
///
/// Rows are heterogeneous JSON arrays; price and volume fields arrive
/// as strings.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct BinanceKline(
    i64,    // open time (ms)
    String, // open
    String, // high
    String, // low
    String, // close
    String, // volume
    i64,    // close time (ms)
    String, // quote asset volume
    u64,    // number of trades
    String, // taker buy base volume
    String, // taker buy quote volume
    String, // unused
);

impl BinanceKline {
    fn to_candle(&self) -> Option<Candle> {
        Some(Candle {
            time: self.0,
            open: self.1.parse().ok()?,
            high: self.2.parse().ok()?,
            low: self.3.parse().ok()?,
            close: self.4.parse().ok()?,
            volume: self.5.parse().ok(),
        })
    }
}

/// Binance REST client for candle series.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    api_key: Option<String>,
}

impl BinanceClient {
    /// Create a new Binance client. Public kline endpoints work
    /// without an API key.
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .user_agent("Vigil/1.0")
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }

    /// Map a "BTC/USDT" style pair to a Binance symbol name.
    fn pair_name(symbol: &str) -> String {
        symbol.replace('/', "").to_uppercase()
    }

    async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/klines", BINANCE_API_URL);

        let mut request = self.client.get(&url).query(&[
            ("symbol", Self::pair_name(symbol)),
            ("interval", timeframe.as_str().to_string()),
            ("limit", limit.to_string()),
        ]);
        if let Some(ref key) = self.api_key {
            request = request.header("X-MBX-APIKEY", key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(
                "Binance API returned {}: {}",
                status,
                &text[..text.len().min(200)]
            );
            return Err(AppError::ExternalApi(format!(
                "Binance API error: {}",
                status
            )));
        }

        let rows: Vec<BinanceKline> = response.json().await?;
        let candles: Vec<Candle> = rows.iter().filter_map(BinanceKline::to_candle).collect();

        if candles.len() < rows.len() {
            warn!(
                "{}: dropped {} malformed kline rows",
                symbol,
                rows.len() - candles.len()
            );
        }

        Ok(candles)
    }
}

impl MarketData for BinanceClient {
    fn fetch_ohlcv<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>> {
        Box::pin(self.fetch_klines(symbol, timeframe, limit))
    }
}
