use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{EventSource, MarketEvent, EVENT_QUEUE_CAPACITY};

/// Replays a prepared list of events. Each `subscribe` takes the list, so a
/// second subscription yields an empty stream.
#[derive(Default)]
pub struct VecSource {
    events: Mutex<Vec<MarketEvent>>,
}

impl VecSource {
    pub fn new(events: Vec<MarketEvent>) -> Self {
        Self {
            events: Mutex::new(events),
        }
    }
}

impl EventSource for VecSource {
    fn subscribe(&self, _symbol: &str, cancel: CancellationToken) -> mpsc::Receiver<MarketEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let events = match self.events.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        tokio::spawn(async move {
            for event in events {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = tx.send(event) => if sent.is_err() { return },
                }
            }
        });
        rx
    }
}
