use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use common::{
    BookTicker, Error, EventSource, MarketEvent, Result, Trade, EVENT_QUEUE_CAPACITY,
};

const MAINNET_WS: &str = "wss://stream.binance.com:9443";
const TESTNET_WS: &str = "wss://testnet.binance.vision";

/// Binance live market data for a single symbol.
///
/// Subscribes to the combined `aggTrade` and `bookTicker` streams and turns
/// frames into `Trade` and `BookTicker` events. Reconnects with exponential
/// backoff; after [`Backoff::MAX_FAILURES`] consecutive failures the last
/// error is sent and the stream ends.
pub struct BinanceStream {
    ws_root: String,
}

impl BinanceStream {
    pub fn new(testnet: bool) -> Self {
        let ws_root = if testnet { TESTNET_WS } else { MAINNET_WS };
        Self {
            ws_root: ws_root.to_string(),
        }
    }

    fn stream_url(&self, symbol: &str) -> Result<Url> {
        let s = symbol.to_lowercase();
        let url_str = format!("{}/stream?streams={s}@aggTrade/{s}@bookTicker", self.ws_root);
        Url::parse(&url_str).map_err(|e| Error::WebSocket(e.to_string()))
    }
}

impl EventSource for BinanceStream {
    fn subscribe(&self, symbol: &str, cancel: CancellationToken) -> mpsc::Receiver<MarketEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let symbol = symbol.to_uppercase();
        let url = self.stream_url(&symbol);

        tokio::spawn(async move {
            match url {
                Ok(url) => run(symbol, url, tx, cancel).await,
                Err(e) => {
                    let _ = tx.send(MarketEvent::Error(e)).await;
                }
            }
        });
        rx
    }
}

/// Reconnect policy: 1s doubling up to 60s, reset by any good frame.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Backoff {
    delay: Duration,
    failures: u32,
}

impl Backoff {
    const INITIAL: Duration = Duration::from_secs(1);
    const MAX_DELAY: Duration = Duration::from_secs(60);
    const MAX_FAILURES: u32 = 5;

    fn new() -> Self {
        Self {
            delay: Self::INITIAL,
            failures: 0,
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record a failure. Returns the delay before the next attempt, or
    /// `None` once the failure budget is spent.
    fn fail(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= Self::MAX_FAILURES {
            return None;
        }
        let delay = self.delay;
        self.delay = (self.delay * 2).min(Self::MAX_DELAY);
        Some(delay)
    }
}

/// Why a connection ended without an error.
enum Closed {
    /// Server closed the socket; reconnect.
    Server,
    /// Nobody is listening any more; stop.
    Receiver,
}

async fn run(symbol: String, url: Url, tx: mpsc::Sender<MarketEvent>, cancel: CancellationToken) {
    let mut backoff = Backoff::new();

    loop {
        info!(symbol = %symbol, "Connecting to Binance WebSocket stream");
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(symbol = %symbol, "Stream cancelled");
                return;
            }
            outcome = connect_once(&url, &tx, &mut backoff) => outcome,
        };

        let err = match outcome {
            Ok(Closed::Receiver) => return,
            Ok(Closed::Server) => {
                info!(symbol = %symbol, "WebSocket stream closed by server");
                Error::WebSocket("connection closed".into())
            }
            Err(e) => e,
        };

        let Some(delay) = backoff.fail() else {
            error!(
                symbol = %symbol,
                error = %err,
                failures = backoff.failures,
                "Giving up on WebSocket stream"
            );
            let _ = tx.send(MarketEvent::Error(err)).await;
            return;
        };
        warn!(symbol = %symbol, error = %err, backoff = ?delay, "WebSocket error, reconnecting");

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn connect_once(
    url: &Url,
    tx: &mpsc::Sender<MarketEvent>,
    backoff: &mut Backoff,
) -> Result<Closed> {
    let (mut ws_stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocket(e.to_string()))?;

    while let Some(msg) = ws_stream.next().await {
        let msg = msg.map_err(|e| Error::WebSocket(e.to_string()))?;

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(Closed::Server),
            _ => continue,
        };

        match parse_frame(&text, Utc::now().timestamp_millis()) {
            Ok(Some(event)) => {
                backoff.reset();
                if tx.send(event).await.is_err() {
                    return Ok(Closed::Receiver);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Failed to parse stream frame");
            }
        }
    }

    Ok(Closed::Server)
}

// ─── Binance combined-stream JSON parsing ─────────────────────────────────────

#[derive(Deserialize)]
struct Envelope {
    stream: String,
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct AggTrade {
    #[serde(rename = "p")]
    price: Decimal,
    #[serde(rename = "q")]
    quantity: Decimal,
    #[serde(rename = "T")]
    trade_time: i64,
    #[serde(rename = "m")]
    is_buyer_maker: bool,
}

#[derive(Deserialize)]
struct BookTickerData {
    #[serde(rename = "b")]
    bid_price: Decimal,
    #[serde(rename = "B")]
    bid_qty: Decimal,
    #[serde(rename = "a")]
    ask_price: Decimal,
    #[serde(rename = "A")]
    ask_qty: Decimal,
}

/// Book ticker frames carry no event time, so they are stamped with `now_ms`.
fn parse_frame(text: &str, now_ms: i64) -> Result<Option<MarketEvent>> {
    let envelope: Envelope = serde_json::from_str(text)?;

    if envelope.stream.ends_with("@aggTrade") {
        let t: AggTrade = serde_json::from_value(envelope.data)?;
        return Ok(Some(MarketEvent::Trade(Trade {
            time: t.trade_time,
            price: t.price,
            quantity: t.quantity,
            is_buyer_maker: t.is_buyer_maker,
        })));
    }

    if envelope.stream.ends_with("@bookTicker") {
        let b: BookTickerData = serde_json::from_value(envelope.data)?;
        return Ok(Some(MarketEvent::BookTicker(BookTicker {
            time: now_ms,
            best_bid_price: b.bid_price,
            best_bid_qty: b.bid_qty,
            best_ask_price: b.ask_price,
            best_ask_qty: b.ask_qty,
        })));
    }

    Ok(None)
}
