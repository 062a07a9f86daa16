//! Volume-weighted average price over the window.
//!
//! VWAP = Σ(typical_price × volume) / Σ(volume). With no traded volume the
//! reading falls back to the last close and a zero deviation.

use crate::domain::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VwapReading {
    pub vwap: f64,
    /// (close - vwap) / vwap
    pub deviation_pct: f64,
    pub valid: bool,
}

impl VwapReading {
    pub fn price_above(&self) -> bool {
        self.valid && self.deviation_pct > 0.0
    }

    pub fn price_below(&self) -> bool {
        self.valid && self.deviation_pct < 0.0
    }
}

pub fn compute_vwap(window: &[Candle]) -> VwapReading {
    let Some(last) = window.last() else {
        return VwapReading::default();
    };

    let total_volume: f64 = window.iter().map(|c| c.volume).sum();
    if total_volume <= 0.0 {
        return VwapReading {
            vwap: last.close,
            deviation_pct: 0.0,
            valid: false,
        };
    }

    let weighted: f64 = window.iter().map(|c| c.typical_price() * c.volume).sum();
    let vwap = weighted / total_volume;
    let deviation_pct = if vwap != 0.0 {
        (last.close - vwap) / vwap
    } else {
        0.0
    };

    VwapReading {
        vwap,
        deviation_pct,
        valid: true,
    }
}
