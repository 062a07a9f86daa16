//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Defaults are tuned for ultra-short horizons: fast=3, slow=7, signal=2.
//! Needs slow + signal - 1 closes.

use super::ema::ema_series;
use crate::domain::candle::{closes, Candle};

pub const DEFAULT_FAST: usize = 3;
pub const DEFAULT_SLOW: usize = 7;
pub const DEFAULT_SIGNAL: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    pub valid: bool,
}

impl MacdReading {
    pub fn bullish(&self) -> bool {
        self.valid && self.line > 0.0 && self.histogram >= 0.0
    }

    pub fn bearish(&self) -> bool {
        self.valid && self.line < 0.0 && self.histogram <= 0.0
    }
}

pub fn compute_macd(window: &[Candle], fast: usize, slow: usize, signal: usize) -> MacdReading {
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow {
        return MacdReading::default();
    }
    if window.len() < slow + signal - 1 {
        return MacdReading::default();
    }

    let prices = closes(window);
    let fast_series = ema_series(&prices, fast);
    let slow_series = ema_series(&prices, slow);

    let macd_line: Vec<f64> = fast_series[slow - 1..]
        .iter()
        .zip(&slow_series[slow - 1..])
        .map(|(f, s)| f - s)
        .collect();

    let signal_series = ema_series(&macd_line, signal);
    let line = macd_line.last().copied().unwrap_or(0.0);
    let signal_value = signal_series.last().copied().unwrap_or(0.0);

    MacdReading {
        line,
        signal: signal_value,
        histogram: line - signal_value,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candles_from_closes;

    #[test]
    fn macd_neutral_when_short() {
        let window = candles_from_closes(&[100.0; 7]);
        assert_eq!(compute_macd(&window, 3, 7, 2), MacdReading::default());
    }

    #[test]
    fn macd_valid_at_minimum_window() {
        let window = candles_from_closes(&[100.0; 8]);
        assert!(compute_macd(&window, 3, 7, 2).valid);
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let window = candles_from_closes(&[100.0; 30]);
        let reading = compute_macd(&window, 3, 7, 2);
        assert!(reading.line.abs() < 1e-9);
        assert!(reading.signal.abs() < 1e-9);
        assert!(reading.histogram.abs() < 1e-9);
        assert!(!reading.bullish());
        assert!(!reading.bearish());
    }

    #[test]
    fn macd_bullish_on_accelerating_rise() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let reading = compute_macd(&candles_from_closes(&closes), 3, 7, 2);
        assert!(reading.line > 0.0);
        assert!(reading.bullish());
    }

    #[test]
    fn macd_bearish_on_accelerating_fall() {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - 0.05 * (i * i) as f64).collect();
        let reading = compute_macd(&candles_from_closes(&closes), 3, 7, 2);
        assert!(reading.line < 0.0);
        assert!(reading.bearish());
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let reading = compute_macd(&candles_from_closes(&closes), 3, 7, 2);
        assert!((reading.histogram - (reading.line - reading.signal)).abs() < 1e-12);
    }

    #[test]
    fn macd_rejects_inverted_periods() {
        let window = candles_from_closes(&[100.0; 30]);
        assert!(!compute_macd(&window, 7, 3, 2).valid);
    }
}
