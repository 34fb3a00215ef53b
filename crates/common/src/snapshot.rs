use std::collections::BTreeMap;

use rust_decimal::Decimal;

/// Flat, oldest-first column views over a bar history.
#[derive(Debug, Clone, Copy)]
pub struct Columns<'a, T> {
    pub time: &'a [i64],
    pub open: &'a [T],
    pub high: &'a [T],
    pub low: &'a [T],
    pub close: &'a [T],
    pub volume: &'a [T],
}

/// Exact-valued history.
pub type History<'a> = Columns<'a, Decimal>;

/// Lossy `f32` history for numeric strategy code.
pub type HistoryF32<'a> = Columns<'a, f32>;

impl<'a, T> Columns<'a, T> {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Keep only the rows in `l..r`.
    pub fn slice(&self, l: usize, r: usize) -> Columns<'a, T> {
        Columns {
            time: &self.time[l..r],
            open: &self.open[l..r],
            high: &self.high[l..r],
            low: &self.low[l..r],
            close: &self.close[l..r],
            volume: &self.volume[l..r],
        }
    }
}

/// Traded quantity per price bucket over one tick.
pub type Cluster = BTreeMap<Decimal, Decimal>;

/// Oldest-first run of committed clusters, borrowed in place from a ring
/// as two contiguous halves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterWindow<'a> {
    older: &'a [Cluster],
    newer: &'a [Cluster],
}

impl<'a> ClusterWindow<'a> {
    /// `newer` continues where `older` ends.
    pub fn new(older: &'a [Cluster], newer: &'a [Cluster]) -> Self {
        Self { older, newer }
    }

    pub fn len(&self) -> usize {
        self.older.len() + self.newer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th committed tick, counting from the oldest.
    pub fn get(&self, i: usize) -> Option<&'a Cluster> {
        match i.checked_sub(self.older.len()) {
            None => self.older.get(i),
            Some(j) => self.newer.get(j),
        }
    }

    /// Most recently committed tick.
    pub fn last(&self) -> Option<&'a Cluster> {
        self.newer.last().or_else(|| self.older.last())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Cluster> + 'a {
        self.older.iter().chain(self.newer.iter())
    }
}

/// Aligned histories handed to a strategy at a decision tick.
///
/// Borrowed from the engine's scratch buffers; valid only for the duration
/// of one signal evaluation.
#[derive(Debug, Clone, Copy)]
pub struct MarketSnapshot<'a> {
    /// Tick being decided, `floor(time / period)`.
    pub tick: i64,
    pub price: HistoryF32<'a>,
    pub buy_count: HistoryF32<'a>,
    pub sell_count: HistoryF32<'a>,
    pub buy_volume: HistoryF32<'a>,
    pub sell_volume: HistoryF32<'a>,
    pub best_ask: HistoryF32<'a>,
    pub best_bid: HistoryF32<'a>,
    /// One price/volume profile per committed tick, oldest first.
    pub clusters: ClusterWindow<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(price: i64) -> Cluster {
        Cluster::from([(Decimal::from(price), Decimal::ONE)])
    }

    #[test]
    fn cluster_window_joins_halves_in_order() {
        let older = [cluster(1), cluster(2)];
        let newer = [cluster(3)];
        let window = ClusterWindow::new(&older, &newer);

        assert_eq!(window.len(), 3);
        assert_eq!(window.get(1), Some(&older[1]));
        assert_eq!(window.get(2), Some(&newer[0]));
        assert_eq!(window.get(3), None);
        assert_eq!(window.last(), Some(&newer[0]));

        let prices: Vec<Decimal> = window.iter().flat_map(|c| c.keys().copied()).collect();
        assert_eq!(prices, vec![Decimal::from(1), Decimal::from(2), Decimal::from(3)]);
    }

    #[test]
    fn empty_window() {
        let window = ClusterWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.last(), None);
        assert_eq!(window.get(0), None);
    }
}
