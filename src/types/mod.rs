pub mod candle;
pub mod position;
pub mod signal;

pub use candle::*;
pub use position::*;
pub use signal::*;
