use common::HistoryF32;

/// Where an RSI reading sits relative to a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

/// Wilder-smoothed Relative Strength Index over `f32` closes.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
    pub overbought: f32,
    pub oversold: f32,
}

impl RsiIndicator {
    pub fn new(period: usize, overbought: f32, oversold: f32) -> Self {
        assert!(period >= 2, "RSI period must be >= 2");
        Self {
            period,
            overbought,
            oversold,
        }
    }

    /// RSI of the latest close, oldest first. `None` until `period + 1` closes exist.
    ///
    /// The first `period` moves seed plain averages; every later move is folded
    /// in with Wilder's `(prev * (n - 1) + x) / n`.
    pub fn compute(&self, closes: &[f32]) -> Option<f32> {
        if closes.len() <= self.period {
            return None;
        }

        let n = self.period as f32;
        let mut moves = closes.windows(2).map(|w| up_down(w[1] - w[0]));
        let (seed_gain, seed_loss) = moves
            .by_ref()
            .take(self.period)
            .fold((0.0, 0.0), |(g, l), (up, down)| (g + up, l + down));

        let (gain, loss) = moves.fold((seed_gain / n, seed_loss / n), |(g, l), (up, down)| {
            ((g * (n - 1.0) + up) / n, (l * (n - 1.0) + down) / n)
        });

        if loss == 0.0 {
            return Some(100.0);
        }
        Some(100.0 - 100.0 / (1.0 + gain / loss))
    }

    /// Band placement of `value`. Oversold wins when the band is degenerate.
    pub fn zone(&self, value: f32) -> RsiZone {
        if value <= self.oversold {
            RsiZone::Oversold
        } else if value >= self.overbought {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        }
    }

    /// Zone of the latest reading over a sealed bar history.
    pub fn zone_of(&self, history: &HistoryF32<'_>) -> Option<RsiZone> {
        self.compute(history.close).map(|value| self.zone(value))
    }
}

/// Split a close-to-close change into (gain, loss), both non-negative.
fn up_down(change: f32) -> (f32, f32) {
    (change.max(0.0), (-change).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Columns;

    fn closes_only(closes: &[f32]) -> HistoryF32<'_> {
        Columns {
            time: &[],
            open: closes,
            high: closes,
            low: closes,
            close: closes,
            volume: closes,
        }
    }

    #[test]
    fn needs_one_more_close_than_period() {
        let rsi = RsiIndicator::new(14, 70.0, 30.0);
        assert!(rsi.compute(&[100.0; 14]).is_none());
        assert!(rsi.compute(&[100.0; 15]).is_some());
    }

    #[test]
    fn one_sided_moves_hit_the_bounds() {
        let rsi = RsiIndicator::new(3, 70.0, 30.0);
        let up = rsi.compute(&[10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
        let down = rsi.compute(&[14.0, 13.0, 12.0, 11.0, 10.0]).unwrap();
        assert!((up - 100.0).abs() < 1e-4, "got {up}");
        assert!(down.abs() < 1e-4, "got {down}");
    }

    #[test]
    fn flat_series_reads_as_no_losses() {
        let rsi = RsiIndicator::new(3, 70.0, 30.0);
        assert_eq!(rsi.compute(&[5.0; 6]), Some(100.0));
    }

    #[test]
    fn wilder_smoothing_after_seed() {
        // Seed over +2, -1: gain 1.0, loss 0.5. Then +2: gain 1.5, loss 0.25, RS 6.
        let rsi = RsiIndicator::new(2, 70.0, 30.0);
        let value = rsi.compute(&[10.0, 12.0, 11.0, 13.0]).unwrap();
        assert!((value - 600.0 / 7.0).abs() < 1e-3, "got {value}");
    }

    #[test]
    fn zones_follow_band_edges() {
        let rsi = RsiIndicator::new(2, 70.0, 30.0);
        assert_eq!(rsi.zone(30.0), RsiZone::Oversold);
        assert_eq!(rsi.zone(50.0), RsiZone::Neutral);
        assert_eq!(rsi.zone(70.0), RsiZone::Overbought);
    }

    #[test]
    fn zone_of_reads_close_column() {
        let rsi = RsiIndicator::new(2, 70.0, 30.0);
        assert_eq!(rsi.zone_of(&closes_only(&[10.0, 11.0])), None);
        assert_eq!(
            rsi.zone_of(&closes_only(&[10.0, 12.0, 11.0, 13.0])),
            Some(RsiZone::Overbought)
        );
        assert_eq!(
            rsi.zone_of(&closes_only(&[13.0, 12.0, 11.0])),
            Some(RsiZone::Oversold)
        );
    }
}
