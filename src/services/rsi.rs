//! Relative Strength Index (RSI) over a candle window.
//!
//! Measures momentum by comparing the magnitude of recent gains to
//! recent losses. Values range from 0-100:
//! - Below 30: Oversold (potential long entry)
//! - Above 70: Overbought (potential short entry)

use crate::types::Candle;

/// Calculate RSI from candle closes with Wilder smoothing.
///
/// Returns `None` when fewer than `window + 1` candles are available.
pub fn rsi(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || candles.len() < window + 1 {
        return None;
    }

    let mut gains = Vec::new();
    let mut losses = Vec::new();

    for i in 1..candles.len() {
        let change = candles[i].close - candles[i - 1].close;
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(-change);
        }
    }

    // Calculate initial averages
    let initial_avg_gain: f64 = gains.iter().take(window).sum::<f64>() / window as f64;
    let initial_avg_loss: f64 = losses.iter().take(window).sum::<f64>() / window as f64;

    // Use smoothed averages for remaining data
    let mut avg_gain = initial_avg_gain;
    let mut avg_loss = initial_avg_loss;

    for i in window..gains.len() {
        avg_gain = (avg_gain * (window - 1) as f64 + gains[i]) / window as f64;
        avg_loss = (avg_loss * (window - 1) as f64 + losses[i]) / window as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_uptrend_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                Candle {
                    time: 1_000_000 + i as i64 * 60_000,
                    open: base,
                    high: base + 2.0,
                    low: base - 1.0,
                    close: base + 1.0,
                    volume: Some(1_000.0),
                }
            })
            .collect()
    }

    fn create_downtrend_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 200.0 - i as f64 * 1.5;
                Candle {
                    time: 1_000_000 + i as i64 * 60_000,
                    open: base,
                    high: base + 1.0,
                    low: base - 2.0,
                    close: base - 1.0,
                    volume: Some(1_000.0),
                }
            })
            .collect()
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let candles = create_uptrend_candles(10);
        assert!(rsi(&candles, 14).is_none());
    }

    #[test]
    fn test_rsi_zero_window() {
        let candles = create_uptrend_candles(50);
        assert!(rsi(&candles, 0).is_none());
    }

    #[test]
    fn test_rsi_uptrend_high_value() {
        let candles = create_uptrend_candles(50);
        let value = rsi(&candles, 14).unwrap();
        assert!(value > 50.0, "RSI in uptrend should be > 50, got {}", value);
    }

    #[test]
    fn test_rsi_downtrend_low_value() {
        let candles = create_downtrend_candles(50);
        let value = rsi(&candles, 14).unwrap();
        assert!(value < 50.0, "RSI in downtrend should be < 50, got {}", value);
    }

    #[test]
    fn test_rsi_pure_uptrend_is_100() {
        // Every close higher than the last: no losses at all.
        let candles = create_uptrend_candles(30);
        assert_eq!(rsi(&candles, 14), Some(100.0));
    }

    #[test]
    fn test_rsi_value_range() {
        let candles = create_downtrend_candles(50);
        let value = rsi(&candles, 14).unwrap();
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn test_rsi_custom_window() {
        let candles = create_uptrend_candles(20);
        assert!(rsi(&candles, 7).is_some());
        assert!(rsi(&candles, 20).is_none());
    }

    #[test]
    fn test_rsi_minimum_history_boundary() {
        let candles = create_uptrend_candles(15);
        assert!(rsi(&candles, 14).is_some());

        let candles = create_uptrend_candles(14);
        assert!(rsi(&candles, 14).is_none());
    }
}
