//! Tick driver shared by historical replay and live trading.
//!
//! Each tick carries every candle that shares one timestamp. Per tick:
//!
//! 1. update symbol windows, mark open positions and record an equity point
//! 2. evaluate exits for every position that received a new price
//! 3. score each updated symbol
//! 4. open new positions through the liquidity check, admission and sizing
//!
//! Capital only changes when a position closes, by the trade's net PnL.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::admission::AdmissionController;
use super::candle::Candle;
use super::execution::{size_entry, CostModel, ExitEvaluator, FeeModel};
use super::features::FeatureComputer;
use super::ledger::PositionLedger;
use super::metrics::PerformanceMetrics;
use super::position::{ExitReason, Position, Trade};
use super::registry::Registry;
use super::scorer::{Scorer, ScorerParams};
use super::signal::Signal;
use super::strategy::{SimulationConfig, StrategyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp_ms: i64,
    pub equity: f64,
}

/// What one tick did to the account.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub timestamp_ms: i64,
    pub capital_before: f64,
    pub capital_after: f64,
    pub closed: Vec<Trade>,
    pub opened: Vec<Position>,
    pub signals: BTreeMap<String, Signal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PerformanceMetrics,
}

pub struct SimulationLoop {
    strategy: StrategyConfig,
    features: FeatureComputer,
    scorer: Scorer,
    exits: ExitEvaluator,
    admission: AdmissionController,
    costs: CostModel,
    registry: Registry,
    ledger: PositionLedger,
    initial_capital: f64,
    capital: f64,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    admitting: bool,
}

impl SimulationLoop {
    pub fn new(strategy: StrategyConfig, simulation: &SimulationConfig) -> Self {
        SimulationLoop::with_parts(
            strategy,
            simulation,
            FeatureComputer::default(),
            ScorerParams::default(),
            Registry::default(),
        )
    }

    pub fn with_parts(
        strategy: StrategyConfig,
        simulation: &SimulationConfig,
        features: FeatureComputer,
        scorer_params: ScorerParams,
        registry: Registry,
    ) -> Self {
        let scorer = Scorer::new(scorer_params, &strategy, &simulation.fees);
        let exits = ExitEvaluator::new(&strategy);
        let admission =
            AdmissionController::new(strategy.max_positions(), simulation.max_concentration);
        let costs = CostModel::new(
            FeeModel::new(simulation.fees, simulation.fee_mode),
            simulation.slippage,
        );
        SimulationLoop {
            strategy,
            features,
            scorer,
            exits,
            admission,
            costs,
            registry,
            ledger: PositionLedger::new(),
            initial_capital: simulation.initial_capital,
            capital: simulation.initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            admitting: true,
        }
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn strategy(&self) -> &StrategyConfig {
        &self.strategy
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn is_admitting(&self) -> bool {
        self.admitting
    }

    /// Stops opening positions. Exits keep running.
    pub fn stop_admitting(&mut self) {
        self.admitting = false;
    }

    /// Puts back positions persisted by an earlier session.
    pub fn restore_positions(&mut self, positions: Vec<Position>) {
        self.ledger.restore(positions);
    }

    /// Drops a just-opened position whose order never reached the exchange.
    /// Capital is untouched.
    pub fn abandon(&mut self, symbol: &str) -> Option<Position> {
        let dropped = self.ledger.discard(symbol);
        if let Some(position) = &dropped {
            warn!(symbol, id = position.id, "entry abandoned");
        }
        dropped
    }

    /// Current signal for `symbol`, from its window as of the last tick.
    pub fn signal_for(&self, symbol: &str) -> Option<Signal> {
        let state = self.registry.state(symbol)?;
        let features = self.features.compute(state.window());
        Some(self.scorer.score(state, &features))
    }

    fn compute_signal(&self, symbol: &str) -> Option<Signal> {
        let signal = self.signal_for(symbol)?;
        if let Some(reason) = signal.veto() {
            debug!(symbol, reason = reason.as_str(), "signal vetoed");
        }
        Some(signal)
    }

    fn equity(&self) -> f64 {
        let prices: BTreeMap<String, f64> = self
            .ledger
            .iter()
            .filter_map(|p| {
                self.registry
                    .last_price(&p.symbol)
                    .map(|price| (p.symbol.clone(), price))
            })
            .collect();
        self.capital + self.ledger.unrealized_pnl(&prices)
    }

    fn record_equity(&mut self, timestamp_ms: i64) {
        let point = EquityPoint {
            timestamp_ms,
            equity: self.equity(),
        };
        match self.equity_curve.last_mut() {
            Some(last) if last.timestamp_ms == timestamp_ms => *last = point,
            Some(last) if last.timestamp_ms > timestamp_ms => {
                warn!(timestamp_ms, last = last.timestamp_ms, "out-of-order tick");
            }
            _ => self.equity_curve.push(point),
        }
    }

    fn settle(&mut self, symbol: &str, price: f64, timestamp_ms: i64, reason: ExitReason) -> Option<Trade> {
        let position = self.ledger.close(symbol)?;
        let lookback = self.scorer.params().volume_lookback;
        let fill = self
            .registry
            .state(symbol)
            .map(|s| s.fill_context(lookback))
            .unwrap_or_default();
        let trade = self
            .costs
            .settle(&position, price, timestamp_ms, reason, &fill);

        self.capital += trade.pnl_usd;
        self.registry.state_mut(symbol).record_trade(trade.pnl_pct);
        info!(
            symbol,
            id = trade.id,
            side = trade.side.as_str(),
            reason = reason.as_str(),
            exit_price = price,
            pnl_usd = trade.pnl_usd,
            capital = self.capital,
            "position closed"
        );
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Processes all candles of one timestamp.
    pub fn on_tick(&mut self, timestamp_ms: i64, candles: &[Candle]) -> TickReport {
        let capital_before = self.capital;
        let activation = self.strategy.trailing_activation();

        // 1
        let mut updated = BTreeSet::new();
        for candle in candles {
            if self.registry.state_mut(&candle.symbol).push(candle.clone()) {
                updated.insert(candle.symbol.clone());
            }
        }
        for symbol in &updated {
            if let Some(price) = self.registry.last_price(symbol) {
                self.ledger.mark(symbol, price, activation);
            }
        }
        self.record_equity(timestamp_ms);

        let mut signals: BTreeMap<String, Signal> = updated
            .iter()
            .filter_map(|s| self.compute_signal(s).map(|sig| (s.clone(), sig)))
            .collect();

        // 2
        let mut closed = Vec::new();
        for symbol in &updated {
            let (Some(position), Some(price)) =
                (self.ledger.get(symbol), self.registry.last_price(symbol))
            else {
                continue;
            };
            let Some(reason) = self.exits.evaluate(position, price, signals.get(symbol)) else {
                continue;
            };
            if let Some(trade) = self.settle(symbol, price, timestamp_ms, reason) {
                closed.push(trade);
                // exploration statistics changed
                if let Some(signal) = self.compute_signal(symbol) {
                    signals.insert(symbol.clone(), signal);
                }
            }
        }

        // 3 and 4
        let mut opened = Vec::new();
        if self.admitting {
            for symbol in &updated {
                if let Some(position) = self.try_open(symbol, timestamp_ms, signals.get(symbol)) {
                    opened.push(position);
                }
            }
        }

        TickReport {
            timestamp_ms,
            capital_before,
            capital_after: self.capital,
            closed,
            opened,
            signals,
        }
    }

    fn try_open(&mut self, symbol: &str, timestamp_ms: i64, signal: Option<&Signal>) -> Option<Position> {
        let signal = signal?;
        let side = signal.direction.side()?;
        if self.ledger.contains(symbol) {
            return None;
        }
        let state = self.registry.state(symbol)?;
        let price = state.last_price()?;

        let min_liquidity = self.strategy.min_liquidity();
        if min_liquidity > 0.0 && state.quote_volume_24h() < min_liquidity {
            debug!(symbol, min_liquidity, "below liquidity floor");
            return None;
        }

        let admission = self
            .admission
            .can_open(self.ledger.counts(), side, self.capital);
        if !admission.is_admitted() {
            debug!(symbol, side = side.as_str(), ?admission, "entry refused");
            return None;
        }

        let size = match size_entry(
            self.capital,
            self.ledger.allocated(),
            self.strategy.position_size_pct(),
        ) {
            Ok(size) => size,
            Err(err) => {
                debug!(symbol, %err, "entry skipped");
                return None;
            }
        };

        let position = self.ledger.open(
            symbol,
            side,
            price,
            timestamp_ms,
            size,
            self.strategy.leverage_f64(),
        )?;
        info!(
            symbol,
            id = position.id,
            side = side.as_str(),
            price,
            size_usd = size,
            score = signal.score,
            "position opened"
        );
        Some(position)
    }

    /// Closes every open position at its last known price.
    pub fn close_all(&mut self, timestamp_ms: i64, reason: ExitReason) -> Vec<Trade> {
        let mut closed = Vec::new();
        for symbol in self.ledger.symbols() {
            let price = self
                .registry
                .last_price(&symbol)
                .or_else(|| self.ledger.get(&symbol).map(|p| p.entry_price));
            if let Some(price) = price {
                closed.extend(self.settle(&symbol, price, timestamp_ms, reason));
            }
        }
        closed
    }

    /// Hands back the registry together with the still-open positions.
    pub fn into_registry(self) -> (Registry, Vec<Position>) {
        let positions = self.ledger.snapshot();
        (self.registry, positions)
    }

    /// Ends the run: force-closes what is still open and computes metrics.
    pub fn finish(mut self) -> SimulationResult {
        let end_time = self
            .equity_curve
            .last()
            .map(|p| p.timestamp_ms)
            .unwrap_or_default();
        self.close_all(end_time, ExitReason::End);
        self.record_equity(end_time);

        let metrics =
            PerformanceMetrics::compute(self.initial_capital, &self.trades, &self.equity_curve);
        SimulationResult {
            initial_capital: self.initial_capital,
            final_capital: self.capital,
            trades: self.trades,
            equity_curve: self.equity_curve,
            metrics,
        }
    }
}

/// Groups candles into ticks by timestamp, oldest first. Within a tick the
/// candles are ordered by symbol.
pub fn group_into_ticks(candles: impl IntoIterator<Item = Candle>) -> Vec<(i64, Vec<Candle>)> {
    let mut ticks: BTreeMap<i64, Vec<Candle>> = BTreeMap::new();
    for candle in candles {
        ticks.entry(candle.timestamp_ms).or_default().push(candle);
    }
    ticks
        .into_iter()
        .map(|(ts, mut batch)| {
            batch.sort_by(|a, b| a.symbol.cmp(&b.symbol));
            (ts, batch)
        })
        .collect()
}

/// Replays candles through a fresh loop and returns the finished run.
pub fn replay(
    strategy: StrategyConfig,
    simulation: &SimulationConfig,
    candles: impl IntoIterator<Item = Candle>,
) -> SimulationResult {
    let mut sim = SimulationLoop::new(strategy, simulation);
    for (timestamp_ms, batch) in group_into_ticks(candles) {
        sim.on_tick(timestamp_ms, &batch);
    }
    sim.finish()
}
