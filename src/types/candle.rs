use serde::{Deserialize, Serialize};

/// A single OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time (unix milliseconds).
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Candle interval used for indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    OneMinute,
    FiveMinute,
    FifteenMinute,
    ThirtyMinute,
    #[default]
    OneHour,
    FourHour,
    OneDay,
    OneWeek,
}

impl Timeframe {
    /// Parse from an exchange-style interval string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Some(Self::OneMinute),
            "5m" => Some(Self::FiveMinute),
            "15m" => Some(Self::FifteenMinute),
            "30m" => Some(Self::ThirtyMinute),
            "1h" => Some(Self::OneHour),
            "4h" => Some(Self::FourHour),
            "1d" => Some(Self::OneDay),
            "1w" => Some(Self::OneWeek),
            _ => None,
        }
    }

    /// Exchange interval string for this timeframe.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinute => "5m",
            Self::FifteenMinute => "15m",
            Self::ThirtyMinute => "30m",
            Self::OneHour => "1h",
            Self::FourHour => "4h",
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
        }
    }

    /// Interval length in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Self::OneMinute => 60,
            Self::FiveMinute => 300,
            Self::FifteenMinute => 900,
            Self::ThirtyMinute => 1_800,
            Self::OneHour => 3_600,
            Self::FourHour => 14_400,
            Self::OneDay => 86_400,
            Self::OneWeek => 604_800,
        }
    }
}
