//! ADX with directional indicators (Wilder).
//!
//! +DM/-DM and true range are Wilder-smoothed over n periods to give +DI/-DI.
//! DX = 100 * |+DI - -DI| / (+DI + -DI), and ADX is the Wilder average of DX.
//! Until n DX values exist the ADX is their plain mean. Needs n+1 candles;
//! neutral reading is ADX 0 with a flat direction.

use super::{mean, wilder_series};
use crate::domain::candle::Candle;

pub const DEFAULT_PERIOD: usize = 14;
pub const STRONG_TREND: f64 = 25.0;
pub const MODERATE_TREND: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdxReading {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
    pub valid: bool,
}

impl AdxReading {
    pub fn strength(&self) -> TrendStrength {
        if self.adx > STRONG_TREND {
            TrendStrength::Strong
        } else if self.adx >= MODERATE_TREND {
            TrendStrength::Moderate
        } else {
            TrendStrength::Weak
        }
    }

    pub fn direction(&self) -> TrendDirection {
        if self.plus_di > self.minus_di {
            TrendDirection::Bullish
        } else if self.minus_di > self.plus_di {
            TrendDirection::Bearish
        } else {
            TrendDirection::Flat
        }
    }
}

pub fn compute_adx(window: &[Candle], period: usize) -> AdxReading {
    if period == 0 || window.len() < period + 1 {
        return AdxReading::default();
    }

    let mut true_ranges = Vec::with_capacity(window.len() - 1);
    let mut plus_dm = Vec::with_capacity(window.len() - 1);
    let mut minus_dm = Vec::with_capacity(window.len() - 1);

    for pair in window.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let up_move = curr.high - prev.high;
        let down_move = prev.low - curr.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        });
        minus_dm.push(if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        });
        true_ranges.push(curr.true_range(prev.close));
    }

    let tr_smooth = wilder_series(&true_ranges, period);
    let plus_smooth = wilder_series(&plus_dm, period);
    let minus_smooth = wilder_series(&minus_dm, period);

    let mut dx_values = Vec::with_capacity(tr_smooth.len());
    let mut last_plus_di = 0.0;
    let mut last_minus_di = 0.0;

    for i in 0..tr_smooth.len() {
        let (plus_di, minus_di) = if tr_smooth[i] > 0.0 {
            (
                100.0 * plus_smooth[i] / tr_smooth[i],
                100.0 * minus_smooth[i] / tr_smooth[i],
            )
        } else {
            (0.0, 0.0)
        };
        let di_sum = plus_di + minus_di;
        dx_values.push(if di_sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / di_sum
        } else {
            0.0
        });
        last_plus_di = plus_di;
        last_minus_di = minus_di;
    }

    let adx = if dx_values.len() >= period {
        wilder_series(&dx_values, period)
            .last()
            .copied()
            .unwrap_or(0.0)
    } else {
        mean(&dx_values)
    };

    AdxReading {
        adx,
        plus_di: last_plus_di,
        minus_di: last_minus_di,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candle;

    fn trending(count: usize, step: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let mid = 100.0 + step * i as f64;
                candle(i, mid, mid + 0.5, mid - 0.5, mid, 1.0)
            })
            .collect()
    }

    #[test]
    fn adx_neutral_when_short() {
        let reading = compute_adx(&trending(14, 1.0), 14);
        assert_eq!(reading, AdxReading::default());
        assert_eq!(reading.strength(), TrendStrength::Weak);
        assert_eq!(reading.direction(), TrendDirection::Flat);
    }

    #[test]
    fn adx_strong_uptrend() {
        let reading = compute_adx(&trending(40, 1.0), 14);
        assert!(reading.valid);
        assert!(reading.plus_di > reading.minus_di);
        assert_eq!(reading.direction(), TrendDirection::Bullish);
        assert_eq!(reading.strength(), TrendStrength::Strong);
    }

    #[test]
    fn adx_strong_downtrend() {
        let reading = compute_adx(&trending(40, -1.0), 14);
        assert_eq!(reading.direction(), TrendDirection::Bearish);
        assert!(reading.adx > STRONG_TREND);
    }

    #[test]
    fn adx_flat_market_is_weak() {
        let reading = compute_adx(&trending(40, 0.0), 14);
        assert!(reading.adx < MODERATE_TREND);
        assert_eq!(reading.strength(), TrendStrength::Weak);
    }

    #[test]
    fn strength_classification_boundaries() {
        let make = |adx| AdxReading {
            adx,
            plus_di: 0.0,
            minus_di: 0.0,
            valid: true,
        };
        assert_eq!(make(25.1).strength(), TrendStrength::Strong);
        assert_eq!(make(25.0).strength(), TrendStrength::Moderate);
        assert_eq!(make(20.0).strength(), TrendStrength::Moderate);
        assert_eq!(make(19.9).strength(), TrendStrength::Weak);
    }
}
