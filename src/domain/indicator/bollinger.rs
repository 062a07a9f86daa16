//! Bollinger Bands.
//!
//! - Middle: SMA over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation. Defaults: period=20,
//! multiplier=2.0. A squeeze is flagged when bandwidth drops below 1%.

use super::{mean, population_stddev};
use crate::domain::candle::{closes, Candle};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const SQUEEZE_BANDWIDTH: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub close: f64,
    /// (upper - lower) / middle
    pub bandwidth: f64,
    /// Position of the close inside the bands, 0 at lower and 1 at upper.
    pub percent_b: f64,
    pub valid: bool,
}

impl Default for BollingerReading {
    fn default() -> Self {
        BollingerReading {
            upper: 0.0,
            middle: 0.0,
            lower: 0.0,
            close: 0.0,
            bandwidth: 0.0,
            percent_b: 0.5,
            valid: false,
        }
    }
}

impl BollingerReading {
    pub fn squeeze(&self) -> bool {
        self.valid && self.bandwidth < SQUEEZE_BANDWIDTH
    }

    pub fn touches_lower(&self) -> bool {
        self.valid && self.upper > self.lower && self.close <= self.lower
    }

    pub fn touches_upper(&self) -> bool {
        self.valid && self.upper > self.lower && self.close >= self.upper
    }
}

pub fn compute_bollinger(window: &[Candle], period: usize, multiplier: f64) -> BollingerReading {
    if period == 0 || window.len() < period {
        return BollingerReading::default();
    }

    let prices = closes(&window[window.len() - period..]);
    let middle = mean(&prices);
    let stddev = population_stddev(&prices);
    let upper = middle + multiplier * stddev;
    let lower = middle - multiplier * stddev;
    let close = prices[prices.len() - 1];

    let bandwidth = if middle != 0.0 {
        (upper - lower) / middle
    } else {
        0.0
    };
    let percent_b = if upper > lower {
        (close - lower) / (upper - lower)
    } else {
        0.5
    };

    BollingerReading {
        upper,
        middle,
        lower,
        close,
        bandwidth,
        percent_b,
        valid: true,
    }
}
