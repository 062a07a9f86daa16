//! Parallel historical replay.
//!
//! Each `(strategy, symbol)` task replays one symbol's candles through its own
//! [`SimulationLoop`](super::simulation::SimulationLoop). Tasks share only the
//! read-only candle map; results come back in task order.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use super::candle::Candle;
use super::error::TraderError;
use super::simulation::{replay, SimulationResult};
use super::strategy::{SimulationConfig, StrategyConfig};
use crate::ports::data_port::CandleSource;

pub type CandleMap = BTreeMap<String, Vec<Candle>>;

#[derive(Debug, Clone)]
pub struct BacktestTask {
    pub name: String,
    pub symbol: String,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestOutcome {
    pub name: String,
    pub symbol: String,
    pub result: SimulationResult,
}

/// Every strategy crossed with every symbol, strategies outermost.
pub fn cross_tasks(strategies: &[(String, StrategyConfig)], symbols: &[String]) -> Vec<BacktestTask> {
    strategies
        .iter()
        .flat_map(|(name, strategy)| {
            symbols.iter().map(move |symbol| BacktestTask {
                name: name.clone(),
                symbol: symbol.clone(),
                strategy: strategy.clone(),
            })
        })
        .collect()
}

/// Fetches candles for each symbol once, before any task runs.
pub fn load_candles(
    source: &dyn CandleSource,
    symbols: &[String],
    start_ms: i64,
    end_ms: i64,
) -> Result<CandleMap, TraderError> {
    let mut map = CandleMap::new();
    for symbol in symbols {
        let candles = source.fetch_candles(symbol, start_ms, end_ms)?;
        if candles.is_empty() {
            return Err(TraderError::NoData {
                symbol: symbol.clone(),
            });
        }
        info!(symbol = symbol.as_str(), candles = candles.len(), "candles loaded");
        map.insert(symbol.clone(), candles);
    }
    Ok(map)
}

/// Runs all tasks on the rayon pool.
pub fn run_backtests(
    tasks: &[BacktestTask],
    simulation: &SimulationConfig,
    data: Arc<CandleMap>,
) -> Result<Vec<BacktestOutcome>, TraderError> {
    tasks
        .par_iter()
        .map(|task| {
            let candles = data.get(&task.symbol).ok_or_else(|| TraderError::NoData {
                symbol: task.symbol.clone(),
            })?;
            let result = replay(task.strategy.clone(), simulation, candles.iter().cloned());
            info!(
                task = task.name.as_str(),
                symbol = task.symbol.as_str(),
                trades = result.trades.len(),
                final_capital = result.final_capital,
                "backtest finished"
            );
            Ok(BacktestOutcome {
                name: task.name.clone(),
                symbol: task.symbol.clone(),
                result,
            })
        })
        .collect()
}
