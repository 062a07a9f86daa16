//! RSI (Relative Strength Index).
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (or 50 when there was no movement at all).
//!
//! Needs n price changes, i.e. n+1 candles. Neutral reading: 50.

use super::wilder_series;
use crate::domain::candle::Candle;

pub const DEFAULT_PERIOD: usize = 14;
pub const OVERSOLD: f64 = 30.0;
pub const OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReading {
    pub value: f64,
    pub valid: bool,
}

impl Default for RsiReading {
    fn default() -> Self {
        RsiReading {
            value: 50.0,
            valid: false,
        }
    }
}

impl RsiReading {
    pub fn oversold(&self) -> bool {
        self.valid && self.value < OVERSOLD
    }

    pub fn overbought(&self) -> bool {
        self.valid && self.value > OVERBOUGHT
    }
}

pub fn compute_rsi(window: &[Candle], period: usize) -> RsiReading {
    if period == 0 || window.len() < period + 1 {
        return RsiReading::default();
    }

    let mut gains = Vec::with_capacity(window.len() - 1);
    let mut losses = Vec::with_capacity(window.len() - 1);
    for pair in window.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let avg_gain = wilder_series(&gains, period).last().copied().unwrap_or(0.0);
    let avg_loss = wilder_series(&losses, period).last().copied().unwrap_or(0.0);

    let value = if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    };

    RsiReading { value, valid: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candles_from_closes;

    #[test]
    fn rsi_empty_window_is_neutral() {
        let reading = compute_rsi(&[], 14);
        assert_eq!(reading, RsiReading::default());
        assert!((reading.value - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_needs_period_plus_one() {
        let window = candles_from_closes(&[100.0; 14]);
        assert!(!compute_rsi(&window, 14).valid);

        let window = candles_from_closes(&(0..15).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        assert!(compute_rsi(&window, 14).valid);
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let reading = compute_rsi(&candles_from_closes(&closes), 14);
        assert!((reading.value - 100.0).abs() < f64::EPSILON);
        assert!(reading.overbought());
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let reading = compute_rsi(&candles_from_closes(&closes), 14);
        assert!(reading.value.abs() < f64::EPSILON);
        assert!(reading.oversold());
    }

    #[test]
    fn rsi_flat_prices_is_fifty() {
        let reading = compute_rsi(&candles_from_closes(&[100.0; 20]), 14);
        assert!(reading.valid);
        assert!((reading.value - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_known_calculation_is_bullish() {
        let closes = [
            44.0, 44.25, 44.50, 43.75, 44.50, 44.25, 44.75, 45.25, 45.50, 45.25, 45.50, 46.0,
            46.25, 46.0, 46.50,
        ];
        let reading = compute_rsi(&candles_from_closes(&closes), 14);
        assert!(reading.value > 50.0 && reading.value < 100.0);
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let reading = compute_rsi(&candles_from_closes(&closes), 14);
        assert!(reading.value >= 0.0 && reading.value <= 100.0);
    }
}
