pub mod binance;
pub mod mock;

pub use binance::BinanceClient;
pub use mock::MockMarket;

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::types::{Candle, Timeframe};

/// Capability to fetch a candle series for a symbol.
///
/// Implemented by the live Binance client and the synthetic mock
/// market; the variant is selected once at startup. A transient
/// failure surfaces as `Err` and the caller skips that cycle.
pub trait MarketData: Send + Sync {
    fn fetch_ohlcv<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Candle>>> + Send + 'a>>;
}
