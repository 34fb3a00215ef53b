use proptest::prelude::*;
use strategy::indicators::{ema_series, MacdIndicator, RsiIndicator};

proptest! {
    /// RSI stays within [0, 100] for any positive price path.
    #[test]
    fn rsi_is_bounded(
        period in 2usize..30,
        closes in prop::collection::vec(0.01f32..100_000.0, 0..200),
    ) {
        let rsi = RsiIndicator::new(period, 70.0, 30.0);
        match rsi.compute(&closes) {
            Some(value) => prop_assert!((0.0..=100.0).contains(&value), "rsi = {}", value),
            None => prop_assert!(closes.len() <= period),
        }
    }

    /// MACD yields a value exactly when enough closes are available.
    #[test]
    fn macd_is_defined_from_min_len(
        fast in 1usize..20,
        extra in 1usize..20,
        signal in 1usize..12,
        closes in prop::collection::vec(1.0f32..10_000.0, 0..120),
    ) {
        let macd = MacdIndicator::new(fast, fast + extra, signal);
        let value = macd.compute(&closes);
        prop_assert_eq!(value.is_some(), closes.len() >= macd.min_len());
        if let Some(v) = value {
            prop_assert!(v.macd.is_finite() && v.signal.is_finite());
        }
    }

    /// EMA of a series lies within the series' range.
    #[test]
    fn ema_stays_in_range(
        period in 1usize..20,
        data in prop::collection::vec(1.0f32..1_000.0, 1..100),
    ) {
        let lo = data.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        for v in ema_series(&data, period) {
            prop_assert!(v >= lo - 1e-2 && v <= hi + 1e-2, "ema {} outside [{}, {}]", v, lo, hi);
        }
    }
}
