//! Average True Range (Wilder) with expansion/contraction detection.
//!
//! True ranges start at the second candle so every value sees a previous
//! close; the reading therefore needs period+1 candles. Expansion compares the
//! current ATR against the mean of the preceding `period` ATR values and needs
//! 2*period+1 candles.

use super::{mean, wilder_series};
use crate::domain::candle::Candle;

pub const DEFAULT_PERIOD: usize = 14;
/// ±10% around the prior-period average.
pub const REGIME_CHANGE_THRESHOLD: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AtrReading {
    pub atr: f64,
    /// ATR as a fraction of the last close.
    pub atr_pct: f64,
    pub expanding: bool,
    pub contracting: bool,
    pub valid: bool,
}

pub fn compute_atr(window: &[Candle], period: usize) -> AtrReading {
    if period == 0 || window.len() < period + 1 {
        return AtrReading::default();
    }

    let true_ranges: Vec<f64> = window
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    let series = wilder_series(&true_ranges, period);
    let Some(&atr) = series.last() else {
        return AtrReading::default();
    };

    let close = window[window.len() - 1].close;
    let atr_pct = if close > 0.0 { atr / close } else { 0.0 };

    let (expanding, contracting) = if series.len() > period {
        let prior = &series[series.len() - 1 - period..series.len() - 1];
        let prior_avg = mean(prior);
        if prior_avg > 0.0 {
            (
                atr > prior_avg * (1.0 + REGIME_CHANGE_THRESHOLD),
                atr < prior_avg * (1.0 - REGIME_CHANGE_THRESHOLD),
            )
        } else {
            (atr > 0.0, false)
        }
    } else {
        (false, false)
    };

    AtrReading {
        atr,
        atr_pct,
        expanding,
        contracting,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candle;

    fn ranged(count: usize, range: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| candle(i, 100.0, 100.0 + range / 2.0, 100.0 - range / 2.0, 100.0, 1.0))
            .collect()
    }

    #[test]
    fn atr_neutral_when_short() {
        assert_eq!(compute_atr(&ranged(14, 2.0), 14), AtrReading::default());
    }

    #[test]
    fn atr_constant_range() {
        let reading = compute_atr(&ranged(15, 2.0), 14);
        assert!(reading.valid);
        assert!((reading.atr - 2.0).abs() < 1e-12);
        assert!((reading.atr_pct - 0.02).abs() < 1e-12);
        assert!(!reading.expanding);
        assert!(!reading.contracting);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let window = vec![
            candle(0, 105.0, 110.0, 100.0, 105.0, 1.0),
            candle(1, 110.0, 115.0, 105.0, 110.0, 1.0),
            candle(2, 115.0, 120.0, 110.0, 115.0, 1.0),
            candle(3, 120.0, 130.0, 110.0, 120.0, 1.0),
        ];
        // TRs: 10, 10, 20. Seed 10, then (10 * 1 + 20) / 2 = 15
        let reading = compute_atr(&window, 2);
        assert!((reading.atr - 15.0).abs() < 1e-9);
    }

    #[test]
    fn atr_detects_expansion() {
        let mut window = ranged(30, 1.0);
        for i in 30..33 {
            window.push(candle(i, 100.0, 105.0, 95.0, 100.0, 1.0));
        }
        let reading = compute_atr(&window, 14);
        assert!(reading.expanding);
        assert!(!reading.contracting);
    }

    #[test]
    fn atr_detects_contraction() {
        let mut window = ranged(30, 10.0);
        for i in 30..40 {
            window.push(candle(i, 100.0, 100.1, 99.9, 100.0, 1.0));
        }
        let reading = compute_atr(&window, 14);
        assert!(reading.contracting);
        assert!(!reading.expanding);
    }
}
