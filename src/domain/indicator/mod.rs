//! Technical indicator calculations over a trailing candle window.
//!
//! Every `compute_*` function is pure and takes the window oldest-first. A
//! window shorter than the indicator's minimum length is a data condition,
//! not a fault: the function returns the reading's neutral `Default`.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod order_flow;
pub mod rsi;
pub mod stddev;
pub mod stochastic;
pub mod vwap;

pub use adx::{compute_adx, AdxReading, TrendDirection, TrendStrength};
pub use atr::{compute_atr, AtrReading};
pub use bollinger::{compute_bollinger, BollingerReading};
pub use ema::{compute_ema_crossover, ema_series, EmaCrossover};
pub use macd::{compute_macd, MacdReading};
pub use order_flow::{compute_order_flow, order_flow_from_book, OrderFlowReading};
pub use rsi::{compute_rsi, RsiReading};
pub use stddev::population_stddev;
pub use stochastic::{compute_stochastic, StochasticReading};
pub use vwap::{compute_vwap, VwapReading};

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean of the last `period` values; `None` when fewer are available.
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(mean(&values[values.len() - period..]))
}

/// Wilder smoothing seeded with the simple mean of the first `period` inputs.
///
/// Output has `inputs.len() - period + 1` entries; empty when the input is
/// shorter than `period`.
pub(crate) fn wilder_series(inputs: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || inputs.len() < period {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(inputs.len() - period + 1);
    let mut current = mean(&inputs[..period]);
    out.push(current);
    for &value in &inputs[period..] {
        current = (current * (period - 1) as f64 + value) / period as f64;
        out.push(current);
    }
    out
}

#[cfg(test)]
pub(crate) mod tests_support {
    use crate::domain::candle::Candle;

    pub fn candle(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            symbol: "TEST".into(),
            timestamp_ms: 1_700_000_000_000 + i as i64 * 60_000,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candles (open = high = low = close) with unit volume.
    pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| candle(i, close, close, close, close, 1.0))
            .collect()
    }
}
