//! Exponential Moving Average and fast/slow crossover.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! The first (n-1) entries of a series are warmup and hold 0.0.

use crate::domain::candle::{closes, Candle};

pub const DEFAULT_FAST: usize = 9;
pub const DEFAULT_SLOW: usize = 20;

pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        if i < period - 1 {
            sum += value;
            out.push(0.0);
        } else if i == period - 1 {
            sum += value;
            ema = sum / period as f64;
            out.push(ema);
        } else {
            ema = value * k + ema * (1.0 - k);
            out.push(ema);
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EmaCrossover {
    pub fast: f64,
    pub slow: f64,
    pub valid: bool,
    /// Fast crossed above slow on the latest candle.
    pub crossed_up: bool,
    /// Fast crossed below slow on the latest candle.
    pub crossed_down: bool,
}

impl EmaCrossover {
    pub fn bullish(&self) -> bool {
        self.valid && self.fast > self.slow
    }

    pub fn bearish(&self) -> bool {
        self.valid && self.fast < self.slow
    }

    /// Fast/slow gap relative to the slow EMA.
    pub fn spread_pct(&self) -> f64 {
        if !self.valid || self.slow == 0.0 {
            return 0.0;
        }
        (self.fast - self.slow) / self.slow
    }
}

pub fn compute_ema_crossover(window: &[Candle], fast: usize, slow: usize) -> EmaCrossover {
    if fast == 0 || slow == 0 || fast >= slow || window.len() < slow {
        return EmaCrossover::default();
    }

    let prices = closes(window);
    let fast_series = ema_series(&prices, fast);
    let slow_series = ema_series(&prices, slow);
    let last = prices.len() - 1;

    let fast_now = fast_series[last];
    let slow_now = slow_series[last];

    let (crossed_up, crossed_down) = if last >= slow {
        let diff_prev = fast_series[last - 1] - slow_series[last - 1];
        let diff_now = fast_now - slow_now;
        (diff_prev <= 0.0 && diff_now > 0.0, diff_prev >= 0.0 && diff_now < 0.0)
    } else {
        (false, false)
    };

    EmaCrossover {
        fast: fast_now,
        slow: slow_now,
        valid: true,
        crossed_up,
        crossed_down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candles_from_closes;

    #[test]
    fn ema_warmup_entries_are_zero() {
        let series = ema_series(&[10.0, 20.0, 30.0, 40.0], 3);
        assert_eq!(series.len(), 4);
        assert_eq!(series[0], 0.0);
        assert_eq!(series[1], 0.0);
        assert!((series[2] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn ema_smoothing_step() {
        let series = ema_series(&[10.0, 20.0, 30.0, 40.0], 3);
        // k = 0.5: 40 * 0.5 + 20 * 0.5 = 30
        assert!((series[3] - 30.0).abs() < 1e-12);
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(ema_series(&[], 3).is_empty());
        assert!(ema_series(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn crossover_neutral_when_short() {
        let window = candles_from_closes(&[100.0; 19]);
        let reading = compute_ema_crossover(&window, 9, 20);
        assert!(!reading.valid);
        assert!(!reading.bullish());
        assert!(!reading.bearish());
    }

    #[test]
    fn crossover_bullish_on_rising_prices() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let reading = compute_ema_crossover(&candles_from_closes(&closes), 9, 20);
        assert!(reading.valid);
        assert!(reading.bullish());
        assert!(reading.spread_pct() > 0.0);
    }

    #[test]
    fn crossover_bearish_on_falling_prices() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - i as f64).collect();
        let reading = compute_ema_crossover(&candles_from_closes(&closes), 9, 20);
        assert!(reading.bearish());
    }

    #[test]
    fn crossover_detects_fresh_cross_up() {
        let mut closes: Vec<f64> = (0..25).map(|i| 200.0 - i as f64).collect();
        closes.push(260.0);
        let reading = compute_ema_crossover(&candles_from_closes(&closes), 3, 20);
        assert!(reading.crossed_up);
        assert!(!reading.crossed_down);
    }
}
