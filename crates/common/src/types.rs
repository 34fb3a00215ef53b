use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Error;

/// One sealed OHLCV aggregate. `time` is the period start in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    pub fn new(
        time: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// A single trade print from the exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub time: i64,
    pub price: Decimal,
    pub quantity: Decimal,
    /// True when the buyer was the resting side, i.e. the print was a market sell.
    pub is_buyer_maker: bool,
}

impl Trade {
    pub fn new(time: i64, price: Decimal, quantity: Decimal) -> Self {
        Self {
            time,
            price,
            quantity,
            is_buyer_maker: false,
        }
    }
}

/// Best bid/ask update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTicker {
    pub time: i64,
    pub best_bid_price: Decimal,
    pub best_bid_qty: Decimal,
    pub best_ask_price: Decimal,
    pub best_ask_qty: Decimal,
}

/// Tagged event produced by an [`EventSource`](crate::EventSource).
///
/// An `Error` is always the last event of its stream.
#[derive(Debug)]
pub enum MarketEvent {
    Error(Error),
    Bar(Bar),
    Trade(Trade),
    BookTicker(BookTicker),
}

impl MarketEvent {
    /// Event timestamp in milliseconds, `None` for errors.
    pub fn time(&self) -> Option<i64> {
        match self {
            MarketEvent::Error(_) => None,
            MarketEvent::Bar(b) => Some(b.time),
            MarketEvent::Trade(t) => Some(t.time),
            MarketEvent::BookTicker(b) => Some(b.time),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MarketEvent::Error(_) => "error",
            MarketEvent::Bar(_) => "bar",
            MarketEvent::Trade(_) => "trade",
            MarketEvent::BookTicker(_) => "book_ticker",
        }
    }
}

/// Position side of the backtest state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Flat, holding quote currency. Initial state.
    #[default]
    AwaitingBuy,
    /// Holding the base asset.
    AwaitingSell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::AwaitingBuy => write!(f, "awaiting_buy"),
            Side::AwaitingSell => write!(f, "awaiting_sell"),
        }
    }
}

/// Which upstream feeds the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    File,
    BinanceHistory,
    BinanceLive,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::BinanceHistory => write!(f, "binance-history"),
            SourceKind::BinanceLive => write!(f, "binance-live"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SourceKind::File),
            "binance-history" => Ok(SourceKind::BinanceHistory),
            "binance-live" => Ok(SourceKind::BinanceLive),
            other => Err(Error::Config(format!(
                "source must be 'file', 'binance-history' or 'binance-live', got: '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_case_insensitively() {
        assert_eq!("FILE".parse::<SourceKind>().unwrap(), SourceKind::File);
        assert_eq!(
            "binance-live".parse::<SourceKind>().unwrap(),
            SourceKind::BinanceLive
        );
        assert!("kraken".parse::<SourceKind>().is_err());
    }

    #[test]
    fn error_event_has_no_time() {
        let ev = MarketEvent::Error(Error::Http("timeout".into()));
        assert_eq!(ev.time(), None);
        assert_eq!(ev.kind(), "error");
    }
}
