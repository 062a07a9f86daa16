//! Market structure and support/resistance from recent swings.
//!
//! The lookback is split into an older and a newer half. A higher high with a
//! higher low is an uptrend, a lower high with a lower low is a downtrend and
//! anything else is ranging.

use super::candle::Candle;

pub const DEFAULT_LOOKBACK: usize = 20;
pub const MIN_STRUCTURE_CANDLES: usize = 10;
/// Distance to a level, as a fraction of price, that still counts as "at" it.
pub const LEVEL_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStructure {
    Uptrend,
    Downtrend,
    Ranging,
}

fn swing_extremes(slice: &[Candle]) -> (f64, f64) {
    let high = slice.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = slice.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    (high, low)
}

fn lookback_slice(window: &[Candle], lookback: usize) -> &[Candle] {
    &window[window.len().saturating_sub(lookback)..]
}

pub fn detect_structure(window: &[Candle], lookback: usize) -> MarketStructure {
    let recent = lookback_slice(window, lookback);
    if recent.len() < MIN_STRUCTURE_CANDLES {
        return MarketStructure::Ranging;
    }

    let (older, newer) = recent.split_at(recent.len() / 2);
    let (old_high, old_low) = swing_extremes(older);
    let (new_high, new_low) = swing_extremes(newer);

    if new_high > old_high && new_low > old_low {
        MarketStructure::Uptrend
    } else if new_high < old_high && new_low < old_low {
        MarketStructure::Downtrend
    } else {
        MarketStructure::Ranging
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyLevels {
    pub support: f64,
    pub resistance: f64,
}

impl KeyLevels {
    pub fn from_window(window: &[Candle], lookback: usize) -> Option<Self> {
        let recent = lookback_slice(window, lookback);
        if recent.is_empty() {
            return None;
        }
        let (resistance, support) = swing_extremes(recent);
        Some(KeyLevels {
            support,
            resistance,
        })
    }

    pub fn near_support(&self, price: f64, tolerance: f64) -> bool {
        price > 0.0 && (price - self.support).abs() / price <= tolerance
    }

    pub fn near_resistance(&self, price: f64, tolerance: f64) -> bool {
        price > 0.0 && (self.resistance - price).abs() / price <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::{candle, candles_from_closes};

    fn series(step: f64, count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let mid = 100.0 + step * i as f64;
                candle(i, mid, mid + 0.5, mid - 0.5, mid, 1.0)
            })
            .collect()
    }

    #[test]
    fn short_window_is_ranging() {
        assert_eq!(detect_structure(&series(1.0, 9), 20), MarketStructure::Ranging);
    }

    #[test]
    fn rising_swings_are_uptrend() {
        assert_eq!(detect_structure(&series(1.0, 30), 20), MarketStructure::Uptrend);
    }

    #[test]
    fn falling_swings_are_downtrend() {
        assert_eq!(detect_structure(&series(-1.0, 30), 20), MarketStructure::Downtrend);
    }

    #[test]
    fn expanding_range_is_ranging() {
        let closes: Vec<f64> = (0..20)
            .map(|i| 100.0 + if i % 2 == 0 { i as f64 } else { -(i as f64) })
            .collect();
        assert_eq!(
            detect_structure(&candles_from_closes(&closes), 20),
            MarketStructure::Ranging
        );
    }

    #[test]
    fn key_levels_use_lookback_extremes() {
        let mut window = candles_from_closes(&[500.0]);
        window.extend(series(1.0, 20));
        let levels = KeyLevels::from_window(&window, 20).unwrap();
        assert!((levels.support - 99.5).abs() < 1e-12);
        assert!((levels.resistance - 119.5).abs() < 1e-12);
        assert!(levels.near_resistance(119.0, LEVEL_TOLERANCE));
        assert!(!levels.near_support(119.0, LEVEL_TOLERANCE));
        assert!(KeyLevels::from_window(&[], 20).is_none());
    }
}
