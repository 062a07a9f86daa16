//! Stochastic oscillator.
//!
//! %K = 100 * (close - lowest low) / (highest high - lowest low) over k candles.
//! %D is the simple mean of the last d %K values, or of however many exist.
//! A flat range reads as 50.

use super::mean;
use crate::domain::candle::Candle;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;
pub const OVERBOUGHT: f64 = 80.0;
pub const OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
    pub valid: bool,
}

impl Default for StochasticReading {
    fn default() -> Self {
        StochasticReading {
            k: 50.0,
            d: 50.0,
            valid: false,
        }
    }
}

impl StochasticReading {
    pub fn overbought(&self) -> bool {
        self.valid && self.k > OVERBOUGHT
    }

    pub fn oversold(&self) -> bool {
        self.valid && self.k < OVERSOLD
    }
}

fn percent_k(slice: &[Candle]) -> f64 {
    let highest = slice.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let lowest = slice.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let close = slice[slice.len() - 1].close;
    if highest > lowest {
        100.0 * (close - lowest) / (highest - lowest)
    } else {
        50.0
    }
}

pub fn compute_stochastic(window: &[Candle], k_period: usize, d_period: usize) -> StochasticReading {
    if k_period == 0 || d_period == 0 || window.len() < k_period {
        return StochasticReading::default();
    }

    let k_values: Vec<f64> = window.windows(k_period).map(percent_k).collect();
    let tail_start = k_values.len().saturating_sub(d_period);
    let k = k_values[k_values.len() - 1];
    let d = mean(&k_values[tail_start..]);

    StochasticReading { k, d, valid: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::{candle, candles_from_closes};

    #[test]
    fn stochastic_neutral_when_short() {
        let reading = compute_stochastic(&candles_from_closes(&[1.0, 2.0]), 14, 3);
        assert_eq!(reading, StochasticReading::default());
        assert!(!reading.overbought());
        assert!(!reading.oversold());
    }

    #[test]
    fn stochastic_flat_range_is_fifty() {
        let reading = compute_stochastic(&candles_from_closes(&[100.0; 14]), 14, 3);
        assert!(reading.valid);
        assert!((reading.k - 50.0).abs() < 1e-12);
        assert!((reading.d - 50.0).abs() < 1e-12);
    }

    #[test]
    fn stochastic_close_at_high_is_overbought() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let reading = compute_stochastic(&candles_from_closes(&closes), 14, 3);
        assert!((reading.k - 100.0).abs() < 1e-12);
        assert!(reading.overbought());
    }

    #[test]
    fn stochastic_close_at_low_is_oversold() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let reading = compute_stochastic(&candles_from_closes(&closes), 14, 3);
        assert!(reading.k.abs() < 1e-12);
        assert!(reading.oversold());
    }

    #[test]
    fn stochastic_d_averages_recent_k() {
        let window = vec![
            candle(0, 5.0, 10.0, 0.0, 5.0, 1.0),
            candle(1, 5.0, 10.0, 0.0, 10.0, 1.0),
            candle(2, 5.0, 10.0, 0.0, 0.0, 1.0),
        ];
        // k values over 2-candle windows: 100, 0
        let reading = compute_stochastic(&window, 2, 3);
        assert!(reading.k.abs() < 1e-12);
        assert!((reading.d - 50.0).abs() < 1e-12);
    }
}
