use rust_decimal::Decimal;

use common::{Cluster, ClusterWindow};

use crate::ring::BoundedRing;

/// Per-tick price/volume profile kept as a rolling window of [`Cluster`]s.
#[derive(Debug, Clone)]
pub struct VolumeClusterTracker {
    bucket: Decimal,
    current: Cluster,
    ring: BoundedRing<Cluster>,
}

impl VolumeClusterTracker {
    /// Bucket width in quote-currency units.
    pub const DEFAULT_BUCKET: Decimal = Decimal::ONE;

    pub fn new(capacity: usize) -> Self {
        Self::with_bucket(capacity, Self::DEFAULT_BUCKET)
    }

    pub fn with_bucket(capacity: usize, bucket: Decimal) -> Self {
        assert!(bucket > Decimal::ZERO, "cluster bucket must be positive");
        Self {
            bucket,
            current: Cluster::new(),
            ring: BoundedRing::new(capacity),
        }
    }

    /// Add `quantity` to the bucket containing `price` in the current tick.
    pub fn accumulate(&mut self, price: Decimal, quantity: Decimal) {
        let key = (price / self.bucket).floor() * self.bucket;
        *self.current.entry(key).or_default() += quantity;
    }

    /// Close the current tick and return all committed ticks, oldest first.
    ///
    /// The window borrows the ring in place.
    pub fn commit_tick(&mut self) -> ClusterWindow<'_> {
        let moment = std::mem::take(&mut self.current);
        self.ring.push_back_forced(moment);
        let (older, newer) = self.ring.as_slices();
        ClusterWindow::new(older, newer)
    }

    /// The uncommitted tick.
    pub fn current(&self) -> &Cluster {
        &self.current
    }

    /// Committed ticks currently held.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn prices_fall_into_floor_buckets() {
        let mut tracker = VolumeClusterTracker::new(4);
        tracker.accumulate(dec!(100.2), dec!(1));
        tracker.accumulate(dec!(100.9), dec!(0.5));
        tracker.accumulate(dec!(101.0), dec!(2));

        let current = tracker.current();
        assert_eq!(current.len(), 2);
        assert_eq!(current[&dec!(100)], dec!(1.5));
        assert_eq!(current[&dec!(101)], dec!(2));
    }

    #[test]
    fn custom_bucket_width() {
        let mut tracker = VolumeClusterTracker::with_bucket(4, dec!(5));
        tracker.accumulate(dec!(103), dec!(1));
        tracker.accumulate(dec!(104.99), dec!(1));
        tracker.accumulate(dec!(105), dec!(1));

        assert_eq!(tracker.current()[&dec!(100)], dec!(2));
        assert_eq!(tracker.current()[&dec!(105)], dec!(1));
    }

    #[test]
    fn commit_pushes_and_resets_current() {
        let mut tracker = VolumeClusterTracker::new(4);
        tracker.accumulate(dec!(10), dec!(1));
        let snapshot = tracker.commit_tick();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(0).unwrap()[&dec!(10)], dec!(1));
        assert!(tracker.current().is_empty());

        // Empty ticks are committed too.
        let snapshot = tracker.commit_tick();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.last().unwrap().is_empty());
    }

    #[test]
    fn ring_evicts_oldest_tick() {
        let mut tracker = VolumeClusterTracker::new(2);
        for price in [dec!(1), dec!(2), dec!(3)] {
            tracker.accumulate(price, dec!(1));
            tracker.commit_tick();
        }
        assert_eq!(tracker.len(), 2);

        tracker.accumulate(dec!(4), dec!(1));
        let snapshot = tracker.commit_tick();
        let keys: Vec<Decimal> = snapshot
            .iter()
            .flat_map(|c| c.keys().copied())
            .collect();
        assert_eq!(keys, vec![dec!(3), dec!(4)]);
    }

    #[test]
    fn window_reads_across_wraparound() {
        let mut tracker = VolumeClusterTracker::new(2);
        for price in [dec!(1), dec!(2)] {
            tracker.accumulate(price, dec!(1));
            tracker.commit_tick();
        }
        // The third commit overwrites slot 0, so the oldest tick now sits at the ring's tail.
        tracker.accumulate(dec!(3), dec!(1));
        let window = tracker.commit_tick();

        assert_eq!(window.len(), 2);
        assert!(window.get(0).unwrap().contains_key(&dec!(2)));
        assert!(window.last().unwrap().contains_key(&dec!(3)));
    }
}
