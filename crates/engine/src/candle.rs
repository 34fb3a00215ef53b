use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use common::{Bar, Columns, History, HistoryF32, Trade};

use crate::ring::BoundedRing;

/// Preallocated backing storage for [`Columns`].
#[derive(Debug, Clone)]
struct ColumnBuf<T> {
    time: Vec<i64>,
    open: Vec<T>,
    high: Vec<T>,
    low: Vec<T>,
    close: Vec<T>,
    volume: Vec<T>,
}

impl<T: Copy + Default> ColumnBuf<T> {
    fn new(cap: usize) -> Self {
        Self {
            time: vec![0; cap],
            open: vec![T::default(); cap],
            high: vec![T::default(); cap],
            low: vec![T::default(); cap],
            close: vec![T::default(); cap],
            volume: vec![T::default(); cap],
        }
    }

    fn fill(&mut self, bars: &[Bar], convert: impl Fn(Decimal) -> T) -> Columns<'_, T> {
        for (i, bar) in bars.iter().enumerate() {
            self.time[i] = bar.time;
            self.open[i] = convert(bar.open);
            self.high[i] = convert(bar.high);
            self.low[i] = convert(bar.low);
            self.close[i] = convert(bar.close);
            self.volume[i] = convert(bar.volume);
        }
        let n = bars.len();
        Columns {
            time: &self.time[..n],
            open: &self.open[..n],
            high: &self.high[..n],
            low: &self.low[..n],
            close: &self.close[..n],
            volume: &self.volume[..n],
        }
    }
}

/// Builds a rolling window of sealed OHLCV bars.
///
/// Bars arrive either pre-built through [`append_raw`](Self::append_raw) or
/// are folded from raw prints by [`add`](Self::add). A print whose period is
/// later than the current one seals the accumulated prints into a bar and
/// then opens the next bar.
#[derive(Debug, Clone)]
pub struct PriceBarAggregator {
    period_ms: i64,
    bars: BoundedRing<Bar>,
    /// Prints of the current, not yet sealed, period.
    pending: Vec<Trade>,
    /// `floor(time / period)` of the current bar; unset until the first event.
    period_index: Option<i64>,
    count: u64,
    scratch: Vec<Bar>,
    exact: ColumnBuf<Decimal>,
    float: ColumnBuf<f32>,
}

impl PriceBarAggregator {
    const PENDING_CAPACITY: usize = 1000;

    pub fn new(period_ms: i64, capacity: usize) -> Self {
        assert!(period_ms > 0, "bar period must be positive");
        Self {
            period_ms,
            bars: BoundedRing::new(capacity),
            pending: Vec::with_capacity(Self::PENDING_CAPACITY),
            period_index: None,
            count: 0,
            scratch: vec![Bar::default(); capacity],
            exact: ColumnBuf::new(capacity),
            float: ColumnBuf::new(capacity),
        }
    }

    /// Push an externally built bar as-is and move the period index to its period.
    /// The in-progress buffer is left untouched.
    pub fn append_raw(&mut self, bar: Bar) {
        self.period_index = Some(bar.time.div_euclid(self.period_ms));
        self.bars.push_back_forced(bar);
        self.count += 1;
    }

    /// Accumulate one print. Returns `true` when this print crossed a period
    /// boundary and a bar was sealed.
    pub fn add(&mut self, trade: Trade) -> bool {
        let period = trade.time.div_euclid(self.period_ms);

        let filled = match self.period_index {
            Some(current) if period > current => {
                self.seal(current, trade.time);
                self.period_index = Some(period);
                true
            }
            Some(_) => false,
            None => {
                self.period_index = Some(period);
                false
            }
        };

        self.pending.push(trade);
        filled
    }

    /// Seal whatever has accumulated so far. Returns `false` if there was nothing to seal.
    pub fn flush(&mut self) -> bool {
        let (Some(at), Some(current)) = (self.pending.first().map(|t| t.time), self.period_index)
        else {
            return false;
        };
        self.seal(current, at);
        true
    }

    /// Oldest-first exact history of sealed bars.
    pub fn history(&mut self) -> History<'_> {
        let n = self.bars.copy_into(&mut self.scratch);
        self.exact.fill(&self.scratch[..n], |d| d)
    }

    /// Oldest-first history converted to `f32`.
    pub fn history_f32(&mut self) -> HistoryF32<'_> {
        let n = self.bars.copy_into(&mut self.scratch);
        self.float.fill(&self.scratch[..n], |d| d.to_f32().unwrap_or(0.0))
    }

    /// Most recently sealed bar, or an all-zero bar if none has been sealed.
    pub fn last(&self) -> Bar {
        self.bars.back().copied().unwrap_or_default()
    }

    /// Total bars ever sealed, not clamped by the window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bars currently held in the window.
    pub fn buf_len(&self) -> usize {
        self.bars.len()
    }

    fn seal(&mut self, period: i64, trigger_time: i64) {
        let bar = self.partial(period, trigger_time);
        self.bars.push_back_forced(bar);
        self.pending.clear();
        self.count += 1;
    }

    /// Fold the pending prints of `period` into a bar.
    ///
    /// An empty buffer yields a zero-volume bar at `trigger_time` priced at
    /// the last sealed close.
    fn partial(&self, period: i64, trigger_time: i64) -> Bar {
        let Some(first) = self.pending.first() else {
            let close = self.last().close;
            return Bar::new(trigger_time, close, close, close, close, Decimal::ZERO);
        };

        let mut time = period * self.period_ms;
        if time == 0 {
            time = first.time;
        }

        let open = first.price;
        let close = self.pending.last().map(|t| t.price).unwrap_or(open);
        let (high, low, volume) = self.pending.iter().fold(
            (open, open, Decimal::ZERO),
            |(high, low, volume), t| (high.max(t.price), low.min(t.price), volume + t.quantity),
        );

        Bar::new(time, open, high, low, close, volume)
    }
}
