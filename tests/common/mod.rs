#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
pub use scalptrader::domain::candle::Candle;
use scalptrader::domain::strategy::{SimulationConfig, StrategyConfig};
use std::path::Path;

pub const T0: i64 = 1_700_000_000_000;
pub const MINUTE: i64 = 60_000;

pub fn make_candle(symbol: &str, i: usize, close: f64, volume: f64) -> Candle {
    Candle {
        symbol: symbol.to_string(),
        timestamp_ms: T0 + i as i64 * MINUTE,
        open: close,
        high: close * 1.001,
        low: close * 0.999,
        close,
        volume,
    }
}

/// Flat candle: open = high = low = close.
pub fn flat_candle(symbol: &str, i: usize, close: f64) -> Candle {
    Candle {
        symbol: symbol.to_string(),
        timestamp_ms: T0 + i as i64 * MINUTE,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

/// Geometric trend with a tight range and rising volume.
pub fn trending(symbol: &str, count: usize, growth: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| make_candle(symbol, i, 100.0 * growth.powi(i as i32), 10.0 + i as f64))
        .collect()
}

/// Seeded random walk with per-candle moves of up to `step` (fractional).
pub fn random_walk(symbol: &str, count: usize, step: f64, seed: u64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = 100.0;
    (0..count)
        .map(|i| {
            close *= 1.0 + rng.gen_range(-step..step);
            let volume = rng.gen_range(5.0..50.0);
            make_candle(symbol, i, close, volume)
        })
        .collect()
}

/// Leverage 25, SL 0.45, TP 0.9, loose entry filters.
pub fn scalp_strategy() -> StrategyConfig {
    scalp_builder().build().unwrap()
}

pub fn scalp_builder() -> scalptrader::domain::strategy::StrategyConfigBuilder {
    StrategyConfig::builder()
        .leverage(25)
        .stop_loss_pct(0.45)
        .take_profit_pct(0.9)
        .trailing_callback(0.05)
        .position_size_pct(0.2)
        .max_positions(5)
        .entry_threshold(0.0)
        .confluence_required(1)
        .volume_ratio(0.5)
}

pub fn frictionless(capital: f64) -> SimulationConfig {
    SimulationConfig::new(capital).frictionless()
}

pub fn write_csv(dir: &Path, symbol: &str, candles: &[Candle]) {
    let mut body = String::from("timestamp_ms,open,high,low,close,volume\n");
    for c in candles {
        body.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.timestamp_ms, c.open, c.high, c.low, c.close, c.volume
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), body).unwrap();
}

pub const VALID_INI: &str = r#"
[strategy]
leverage = 25
stop_loss_pct = 0.45
take_profit_pct = 0.9
trailing_callback = 0.05
position_size_pct = 0.2
max_positions = 5
entry_threshold = 0
confluence_required = 1
volume_ratio = 0.5

[simulation]
initial_capital = 50
maker_rate = 0
taker_rate = 0
slippage_base_bps = 0
slippage_impact_bps = 0
slippage_max_bps = 0
"#;
