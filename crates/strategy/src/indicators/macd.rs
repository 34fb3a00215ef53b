/// MACD (Moving Average Convergence/Divergence) indicator.
///
/// Computes: MACD line = EMA(fast) − EMA(slow), Signal = EMA(macd_line, signal_period).
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

/// MACD and signal line values on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub macd: f32,
    pub signal: f32,
}

impl MacdValue {
    pub fn histogram(&self) -> f32 {
        self.macd - self.signal
    }
}

impl MacdIndicator {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(
            fast < slow,
            "MACD fast period must be less than slow period"
        );
        Self { fast, slow, signal }
    }

    /// Bars needed before `compute` returns a value.
    pub fn min_len(&self) -> usize {
        self.slow + self.signal - 1
    }

    /// Compute MACD on the latest bar from close prices (oldest first).
    /// Returns `None` if there isn't enough data.
    pub fn compute(&self, closes: &[f32]) -> Option<MacdValue> {
        if closes.len() < self.min_len() {
            return None;
        }

        let fast = ema_series(closes, self.fast);
        let slow = ema_series(closes, self.slow);

        // Align both EMAs on the tail: slow starts `slow - fast` bars later.
        let offset = self.slow - self.fast;
        let macd_line: Vec<f32> = slow
            .iter()
            .zip(&fast[offset..])
            .map(|(s, f)| f - s)
            .collect();

        let signal_line = ema_series(&macd_line, self.signal);

        Some(MacdValue {
            macd: *macd_line.last()?,
            signal: *signal_line.last()?,
        })
    }
}

/// Exponential moving average seeded with the SMA of the first `period` values.
///
/// Element `i` of the result corresponds to `data[i + period - 1]`; the
/// result is empty when `data` is shorter than `period`.
pub fn ema_series(data: &[f32], period: usize) -> Vec<f32> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (period as f32 + 1.0);

    let mut out = Vec::with_capacity(data.len() - period + 1);
    let mut ema = data[..period].iter().sum::<f32>() / period as f32;
    out.push(ema);

    for &price in &data[period..] {
        ema = price * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> Vec<f32> {
        (0..n).map(|i| 100.0 + i as f32 * 0.5).collect()
    }

    fn trending_down(n: usize) -> Vec<f32> {
        (0..n).map(|i| 200.0 - i as f32 * 0.5).collect()
    }

    #[test]
    fn ema_of_constant_series_is_constant() {
        let ema = ema_series(&[5.0; 10], 3);
        assert_eq!(ema.len(), 8);
        assert!(ema.iter().all(|v| (v - 5.0).abs() < 1e-6));
    }

    #[test]
    fn ema_short_input_is_empty() {
        assert!(ema_series(&[1.0, 2.0], 3).is_empty());
        assert!(ema_series(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn macd_returns_none_with_insufficient_data() {
        let macd = MacdIndicator::new(12, 26, 9);
        let prices = vec![100.0; 33]; // need >= 34
        assert!(macd.compute(&prices).is_none());
    }

    #[test]
    fn macd_returns_some_with_exact_minimum() {
        let macd = MacdIndicator::new(12, 26, 9);
        let prices: Vec<f32> = (0..34).map(|i| 100.0 + i as f32).collect();
        assert!(macd.compute(&prices).is_some());
    }

    #[test]
    fn macd_above_signal_in_accelerating_uptrend() {
        let macd = MacdIndicator::new(3, 6, 3);
        let mut prices = trending_down(20);
        prices.extend((0..10).map(|i| 190.0 + (i * i) as f32));
        let v = macd.compute(&prices).unwrap();
        assert!(v.macd > v.signal, "expected bullish, got {v:?}");
        assert!(v.histogram() > 0.0);
    }

    #[test]
    fn macd_below_signal_in_accelerating_downtrend() {
        let macd = MacdIndicator::new(3, 6, 3);
        let mut prices = trending_up(20);
        prices.extend((0..10).map(|i| 110.0 - (i * i) as f32));
        let v = macd.compute(&prices).unwrap();
        assert!(v.macd < v.signal, "expected bearish, got {v:?}");
    }

    #[test]
    #[should_panic(expected = "fast period must be less than slow")]
    fn macd_rejects_inverted_periods() {
        let _ = MacdIndicator::new(26, 12, 9);
    }
}
