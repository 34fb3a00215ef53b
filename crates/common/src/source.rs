use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::MarketEvent;

/// Capacity of the bounded queue between a producer task and the runner.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Abstraction over an upstream of market events.
///
/// `BinanceStream` implements this for live trades and book tickers.
/// `BinanceHistory` and `HistoryFile` replay pre-built bars.
///
/// Implementations spawn one producer task that feeds a bounded channel
/// (backpressure is the producer blocking on a full queue). The stream ends
/// when the sender is dropped. A `MarketEvent::Error` is sent at most once
/// and is always the last event. On cancellation the producer stops quietly.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, symbol: &str, cancel: CancellationToken) -> mpsc::Receiver<MarketEvent>;
}
