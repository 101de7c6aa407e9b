//! Vigil - RSI momentum signal bot with per-symbol scheduling and
//! Telegram alerts.

pub mod config;
pub mod error;
pub mod notify;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use services::{Scheduler, SignalEngine};
pub use types::*;
