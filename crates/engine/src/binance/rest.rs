use std::str::FromStr;

use reqwest::Client;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use common::{Bar, Error, EventSource, MarketEvent, Result, EVENT_QUEUE_CAPACITY};

const MAINNET_API: &str = "https://api.binance.com/api";
const TESTNET_API: &str = "https://testnet.binance.vision/api";

/// Maximum klines Binance returns per request.
const PAGE_LIMIT: usize = 1000;

/// Historical klines from the Binance REST API, replayed as `Bar` events.
///
/// Pages forward from `startTime=0`, i.e. the symbol's first listed kline,
/// until a short page.
#[derive(Clone)]
pub struct BinanceHistory {
    http: Client,
    api_root: String,
    interval: String,
}

impl BinanceHistory {
    /// `interval` is a Binance kline interval such as `"1m"` or `"1d"`.
    pub fn new(testnet: bool, interval: impl Into<String>) -> Result<Self> {
        let api_root = if testnet { TESTNET_API } else { MAINNET_API };
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_root: api_root.to_string(),
            interval: interval.into(),
        })
    }

    fn klines_url(&self, symbol: &str, start_time: i64) -> String {
        format!(
            "{}/v3/klines?symbol={symbol}&interval={}&limit={PAGE_LIMIT}&startTime={start_time}",
            self.api_root, self.interval
        )
    }

    async fn fetch_page(&self, symbol: &str, start_time: i64) -> Result<Vec<Bar>> {
        let url = self.klines_url(symbol, start_time);
        debug!(url = %url, "Fetching klines");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Exchange(format!("HTTP {status}: {body}")));
        }
        parse_klines(&body)
    }
}

impl EventSource for BinanceHistory {
    fn subscribe(&self, symbol: &str, cancel: CancellationToken) -> mpsc::Receiver<MarketEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let source = self.clone();
        let symbol = symbol.to_uppercase();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => debug!(symbol = %symbol, "Kline replay cancelled"),
                _ = source.replay(&symbol, &tx) => {}
            }
        });
        rx
    }
}

impl BinanceHistory {
    async fn replay(&self, symbol: &str, tx: &mpsc::Sender<MarketEvent>) {
        info!(symbol = %symbol, interval = %self.interval, "Replaying Binance klines");

        let mut start_time = 0;
        let mut sent: u64 = 0;
        loop {
            let page = match self.fetch_page(symbol, start_time).await {
                Ok(page) => page,
                Err(e) => {
                    let _ = tx.send(MarketEvent::Error(e)).await;
                    return;
                }
            };

            let full = page.len() >= PAGE_LIMIT;
            let next = next_start(&page);
            for bar in page {
                if tx.send(MarketEvent::Bar(bar)).await.is_err() {
                    return;
                }
                sent += 1;
            }

            match next {
                Some(next) if full => start_time = next,
                _ => break,
            }
        }
        info!(symbol = %symbol, bars = sent, "Kline history exhausted");
    }
}

/// Start time of the page after `page`: one past its last open time.
fn next_start(page: &[Bar]) -> Option<i64> {
    page.last().map(|bar| bar.time + 1)
}

/// Parse a `/v3/klines` body. Rows are arrays whose first six elements are
/// open time (ms) and the OHLCV values as strings; the rest is ignored.
fn parse_klines(body: &str) -> Result<Vec<Bar>> {
    let rows: Vec<Vec<serde_json::Value>> = serde_json::from_str(body)?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_kline(row).map_err(|e| Error::Parse(format!("kline {i}: {e}"))))
        .collect()
}

fn parse_kline(row: &[serde_json::Value]) -> Result<Bar> {
    if row.len() < 6 {
        return Err(Error::Parse(format!(
            "expected at least 6 fields, got {}",
            row.len()
        )));
    }

    let time = row[0]
        .as_i64()
        .ok_or_else(|| Error::Parse(format!("invalid open time {}", row[0])))?;
    let decimal = |idx: usize| -> Result<Decimal> {
        let raw = row[idx]
            .as_str()
            .ok_or_else(|| Error::Parse(format!("field {idx} is not a string: {}", row[idx])))?;
        Ok(Decimal::from_str(raw)?)
    };

    Ok(Bar::new(
        time,
        decimal(1)?,
        decimal(2)?,
        decimal(3)?,
        decimal(4)?,
        decimal(5)?,
    ))
}
