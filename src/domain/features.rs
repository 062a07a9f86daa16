//! Feature computation: every indicator over one trailing window.

use std::collections::BTreeMap;

use super::candle::Candle;
use super::indicator::{
    adx, atr, bollinger, compute_adx, compute_atr, compute_bollinger, compute_ema_crossover,
    compute_macd, compute_order_flow, compute_rsi, compute_stochastic, compute_vwap, ema, macd,
    rsi, stochastic, AdxReading, AtrReading, BollingerReading, EmaCrossover, MacdReading,
    OrderFlowReading, RsiReading, StochasticReading, VwapReading,
};

/// Indicator periods used by [`FeatureComputer`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_period: usize,
    pub bollinger_multiplier: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub adx_period: usize,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub atr_period: usize,
}

impl Default for FeatureParams {
    fn default() -> Self {
        FeatureParams {
            rsi_period: rsi::DEFAULT_PERIOD,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_multiplier: bollinger::DEFAULT_MULTIPLIER,
            ema_fast: ema::DEFAULT_FAST,
            ema_slow: ema::DEFAULT_SLOW,
            adx_period: adx::DEFAULT_PERIOD,
            stochastic_k: stochastic::DEFAULT_K_PERIOD,
            stochastic_d: stochastic::DEFAULT_D_PERIOD,
            atr_period: atr::DEFAULT_PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSet {
    pub rsi: RsiReading,
    pub macd: MacdReading,
    pub bollinger: BollingerReading,
    pub ema: EmaCrossover,
    pub vwap: VwapReading,
    pub adx: AdxReading,
    pub stochastic: StochasticReading,
    pub atr: AtrReading,
    pub order_flow: OrderFlowReading,
}

impl FeatureSet {
    /// Flat name -> value view, for logging and export.
    pub fn values(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("rsi", self.rsi.value),
            ("macd_line", self.macd.line),
            ("macd_signal", self.macd.signal),
            ("macd_histogram", self.macd.histogram),
            ("bb_upper", self.bollinger.upper),
            ("bb_middle", self.bollinger.middle),
            ("bb_lower", self.bollinger.lower),
            ("bb_bandwidth", self.bollinger.bandwidth),
            ("bb_percent_b", self.bollinger.percent_b),
            ("ema_fast", self.ema.fast),
            ("ema_slow", self.ema.slow),
            ("vwap", self.vwap.vwap),
            ("vwap_deviation", self.vwap.deviation_pct),
            ("adx", self.adx.adx),
            ("plus_di", self.adx.plus_di),
            ("minus_di", self.adx.minus_di),
            ("stoch_k", self.stochastic.k),
            ("stoch_d", self.stochastic.d),
            ("atr", self.atr.atr),
            ("atr_pct", self.atr.atr_pct),
            ("order_flow_imbalance", self.order_flow.imbalance),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureComputer {
    params: FeatureParams,
}

impl FeatureComputer {
    pub fn new(params: FeatureParams) -> Self {
        FeatureComputer { params }
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    pub fn compute(&self, window: &[Candle]) -> FeatureSet {
        let p = &self.params;
        FeatureSet {
            rsi: compute_rsi(window, p.rsi_period),
            macd: compute_macd(window, p.macd_fast, p.macd_slow, p.macd_signal),
            bollinger: compute_bollinger(window, p.bollinger_period, p.bollinger_multiplier),
            ema: compute_ema_crossover(window, p.ema_fast, p.ema_slow),
            vwap: compute_vwap(window),
            adx: compute_adx(window, p.adx_period),
            stochastic: compute_stochastic(window, p.stochastic_k, p.stochastic_d),
            atr: compute_atr(window, p.atr_period),
            order_flow: compute_order_flow(window),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candles_from_closes;

    #[test]
    fn short_window_yields_neutral_defaults() {
        let window = candles_from_closes(&[100.0, 101.0]);
        let features = FeatureComputer::default().compute(&window);

        assert_eq!(features.rsi.value, 50.0);
        assert_eq!(features.adx.adx, 0.0);
        assert_eq!(features.stochastic.k, 50.0);
        assert_eq!(features.stochastic.d, 50.0);
        assert_eq!(features.macd, MacdReading::default());
        assert_eq!(features.atr.atr, 0.0);
        assert_eq!(features.bollinger.percent_b, 0.5);
        assert_eq!(features.bollinger.upper, 0.0);
        assert_eq!(features.vwap.vwap, 101.0);
        assert_eq!(features.vwap.deviation_pct, 0.0);
    }

    #[test]
    fn empty_window_does_not_panic() {
        let features = FeatureComputer::default().compute(&[]);
        assert_eq!(features.order_flow.imbalance, 0.0);
        assert_eq!(features.vwap, VwapReading::default());
    }

    #[test]
    fn long_window_is_valid_everywhere() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let features = FeatureComputer::default().compute(&candles_from_closes(&closes));
        assert!(features.rsi.valid);
        assert!(features.macd.valid);
        assert!(features.bollinger.valid);
        assert!(features.ema.valid);
        assert!(features.adx.valid);
        assert!(features.stochastic.valid);
        assert!(features.atr.valid);
    }

    #[test]
    fn values_view_names_every_indicator() {
        let values = FeatureSet::default().values();
        for key in ["rsi", "macd_line", "bb_percent_b", "ema_fast", "vwap", "adx", "stoch_k", "atr"] {
            assert!(values.contains_key(key), "missing {key}");
        }
    }
}
