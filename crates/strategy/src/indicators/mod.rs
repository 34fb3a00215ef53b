pub mod macd;
pub mod rsi;

pub use macd::{ema_series, MacdIndicator, MacdValue};
pub use rsi::{RsiIndicator, RsiZone};
