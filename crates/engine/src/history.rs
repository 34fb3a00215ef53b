use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use common::{Bar, Error, EventSource, MarketEvent, Result, EVENT_QUEUE_CAPACITY};

/// Fields per record: time in seconds, open, high, low, close, volume.
const RECORD_LEN: usize = 6;

/// Reads headerless `time,open,high,low,close,volume` CSV records as bars.
/// Record time is in seconds; bar time is in milliseconds.
pub struct HistoryReader<R> {
    inner: csv::Reader<R>,
    record: csv::StringRecord,
}

impl HistoryReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("failed to open history file '{}': {e}", path.display()),
            ))
        })?;
        Ok(Self::new(file))
    }
}

impl<R: io::Read> HistoryReader<R> {
    pub fn new(reader: R) -> Self {
        let inner = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self {
            inner,
            record: csv::StringRecord::new(),
        }
    }

    /// Next bar, or `None` at end of input.
    pub fn read_bar(&mut self) -> Result<Option<Bar>> {
        if !self.inner.read_record(&mut self.record)? {
            return Ok(None);
        }
        let line = self.record.position().map_or(0, |p| p.line());
        parse_record(&self.record, line).map(Some)
    }
}

impl<R: io::Read> Iterator for HistoryReader<R> {
    type Item = Result<Bar>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_bar().transpose()
    }
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<Bar> {
    if record.len() < RECORD_LEN {
        return Err(Error::Parse(format!(
            "record on line {line}: wrong number of fields {}, expected at least {RECORD_LEN}",
            record.len()
        )));
    }

    let seconds: i64 = record[0].parse().map_err(|e| {
        Error::Parse(format!("record on line {line}: invalid time '{}': {e}", &record[0]))
    })?;
    let time = seconds.checked_mul(1000).ok_or_else(|| {
        Error::Parse(format!("record on line {line}: time {seconds} out of range"))
    })?;

    let field = |idx: usize, name: &str| -> Result<Decimal> {
        Decimal::from_str(&record[idx])
            .or_else(|_| Decimal::from_scientific(&record[idx]))
            .map_err(|e| {
                Error::Parse(format!(
                    "record on line {line}: invalid {name} '{}': {e}",
                    &record[idx]
                ))
            })
    };

    Ok(Bar::new(
        time,
        field(1, "open")?,
        field(2, "high")?,
        field(3, "low")?,
        field(4, "close")?,
        field(5, "volume")?,
    ))
}

/// Writes bars in the format read by [`HistoryReader`].
pub struct HistoryWriter<W: io::Write> {
    inner: csv::Writer<W>,
}

impl HistoryWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: io::Write> HistoryWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
        }
    }

    pub fn write(&mut self, bar: &Bar) -> Result<()> {
        self.inner.write_record([
            bar.time.div_euclid(1000).to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| Error::Io(io::Error::other(e.to_string())))
    }
}

/// Replays bars from a history CSV file. The symbol is ignored.
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventSource for HistoryFile {
    fn subscribe(&self, _symbol: &str, cancel: CancellationToken) -> mpsc::Receiver<MarketEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            info!(path = %path.display(), "Replaying history file");
            let reader = match HistoryReader::open(&path) {
                Ok(reader) => reader,
                Err(e) => {
                    let _ = tx.blocking_send(MarketEvent::Error(e));
                    return;
                }
            };

            let mut sent: u64 = 0;
            for bar in reader {
                if cancel.is_cancelled() {
                    debug!(bars = sent, "History replay cancelled");
                    return;
                }
                let event = match bar {
                    Ok(bar) => MarketEvent::Bar(bar),
                    Err(e) => {
                        let _ = tx.blocking_send(MarketEvent::Error(e));
                        return;
                    }
                };
                if tx.blocking_send(event).is_err() {
                    return;
                }
                sent += 1;
            }
            info!(bars = sent, "History file exhausted");
        });

        rx
    }
}

/// Forwards another source's events unchanged and appends every bar to a
/// history file on the way through.
pub struct Recorder {
    inner: Arc<dyn EventSource>,
    path: PathBuf,
}

impl Recorder {
    pub fn new(inner: Arc<dyn EventSource>, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
        }
    }
}

impl EventSource for Recorder {
    fn subscribe(&self, symbol: &str, cancel: CancellationToken) -> mpsc::Receiver<MarketEvent> {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let mut upstream = self.inner.subscribe(symbol, cancel);
        let path = self.path.clone();

        tokio::spawn(async move {
            let mut writer = match HistoryWriter::create(&path) {
                Ok(writer) => writer,
                Err(e) => {
                    let _ = tx.send(MarketEvent::Error(e)).await;
                    return;
                }
            };
            info!(path = %path.display(), "Recording bars");

            let mut recorded: u64 = 0;
            while let Some(event) = upstream.recv().await {
                if let MarketEvent::Bar(bar) = &event {
                    if let Err(e) = writer.write(bar) {
                        let _ = tx.send(MarketEvent::Error(e)).await;
                        return;
                    }
                    recorded += 1;
                }
                if tx.send(event).await.is_err() {
                    break;
                }
            }

            if let Err(e) = writer.flush() {
                warn!(path = %path.display(), error = %e, "Failed to flush recorded bars");
            } else {
                info!(path = %path.display(), bars = recorded, "Recording finished");
            }
        });

        rx
    }
}
