//! Live trading session.
//!
//! Producers push [`MarketEvent`]s into a bounded channel; a single consumer
//! owns the [`SimulationLoop`] and is the only place positions change. After
//! every candle batch the ledger and leverage cache are written to the state
//! store on the blocking pool. A failed write is logged and picked up by the
//! next batch.
//!
//! Stopping runs three steps in order: stop admitting, flush state, close the
//! exchange connection.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use super::retry::{with_retry, RetryPolicy};
use crate::domain::candle::Candle;
use crate::domain::error::TraderError;
use crate::domain::leverage_cache::LeverageLookup;
use crate::domain::position::{ExitReason, Position, Side, Trade};
use crate::domain::registry::{Registry, DEFAULT_WINDOW_CAPACITY};
use crate::domain::simulation::{group_into_ticks, SimulationLoop};
use crate::domain::strategy::{SimulationConfig, StrategyConfig};
use crate::domain::symbol_state::BookSnapshot;
use crate::ports::exchange_port::{ExchangeError, ExchangePort};
use crate::ports::state_port::StateStore;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    /// Closed candles. Candles sharing a timestamp form one tick.
    Candles(Vec<Candle>),
    Book { symbol: String, book: BookSnapshot },
    Funding { symbol: String, rate: f64 },
}

/// Bounded event channel. Senders wait when the consumer falls behind.
pub fn event_channel(capacity: usize) -> (mpsc::Sender<MarketEvent>, mpsc::Receiver<MarketEvent>) {
    mpsc::channel(capacity.max(1))
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub retry: RetryPolicy,
    pub window_capacity: usize,
    /// Close every open position with reduce-only orders when stopping,
    /// instead of leaving them for the next session.
    pub close_on_stop: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            retry: RetryPolicy::default(),
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            close_on_stop: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub ticks: usize,
    pub capital: f64,
    pub trades: Vec<Trade>,
    pub open_positions: Vec<Position>,
}

pub struct LiveSession<E: ExchangePort> {
    sim: SimulationLoop,
    exchange: E,
    store: Arc<dyn StateStore>,
    options: SessionOptions,
    last_tick_ms: i64,
    ticks: usize,
}

impl<E: ExchangePort> LiveSession<E> {
    /// Restores the registry and open positions from `store`.
    pub fn start(
        strategy: StrategyConfig,
        simulation: &SimulationConfig,
        exchange: E,
        store: Arc<dyn StateStore>,
        options: SessionOptions,
    ) -> Result<Self, TraderError> {
        let (registry, positions) = Registry::init(store.as_ref(), options.window_capacity)?;
        let mut sim = SimulationLoop::with_parts(
            strategy,
            simulation,
            Default::default(),
            Default::default(),
            registry,
        );
        info!(restored = positions.len(), "live session started");
        sim.restore_positions(positions);
        Ok(LiveSession {
            sim,
            exchange,
            store,
            options,
            last_tick_ms: 0,
            ticks: 0,
        })
    }

    pub fn simulation(&self) -> &SimulationLoop {
        &self.sim
    }

    /// Consumes events until `stop` flips to true or every sender is gone,
    /// then shuts down.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<MarketEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<SessionSummary, TraderError> {
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => break,
                },
            }
        }
        self.shutdown().await
    }

    pub async fn handle(&mut self, event: MarketEvent) {
        match event {
            MarketEvent::Candles(candles) => {
                for (timestamp_ms, batch) in group_into_ticks(candles) {
                    self.on_tick(timestamp_ms, &batch).await;
                }
                self.persist().await;
            }
            MarketEvent::Book { symbol, book } => {
                self.sim
                    .registry_mut()
                    .state_mut(&symbol)
                    .set_book(Some(book));
            }
            MarketEvent::Funding { symbol, rate } => {
                self.sim
                    .registry_mut()
                    .state_mut(&symbol)
                    .set_funding_rate(rate);
            }
        }
    }

    async fn on_tick(&mut self, timestamp_ms: i64, candles: &[Candle]) {
        self.last_tick_ms = self.last_tick_ms.max(timestamp_ms);
        self.ticks += 1;
        let report = self.sim.on_tick(timestamp_ms, candles);

        for trade in &report.closed {
            self.close_on_exchange(trade).await;
        }

        for position in &report.opened {
            if let Err(err) = self.open_on_exchange(position, timestamp_ms).await {
                error!(symbol = position.symbol.as_str(), %err, "entry order failed");
                self.sim.abandon(&position.symbol);
            }
        }
    }

    async fn ensure_leverage(&mut self, symbol: &str, side: Side, now_ms: i64) -> Result<u32, ExchangeError> {
        let wanted = self.sim.strategy().leverage();
        match self.sim.registry().leverage_cache().lookup(symbol, side, now_ms) {
            LeverageLookup::Fresh(leverage) if leverage == wanted => return Ok(leverage),
            LeverageLookup::PermanentlyFailed { code } => {
                return Err(ExchangeError::Permanent {
                    code: code.unwrap_or_default(),
                    reason: "leverage previously rejected".into(),
                });
            }
            _ => {}
        }

        let exchange = &self.exchange;
        let result = with_retry(&self.options.retry, "set_leverage", || {
            exchange.set_leverage(symbol, side, wanted)
        })
        .await;

        let cache = self.sim.registry_mut().leverage_cache_mut();
        match &result {
            Ok(applied) => cache.record_success(symbol, side, *applied, now_ms),
            Err(ExchangeError::Permanent { code, .. }) => {
                cache.record_permanent_failure(symbol, side, wanted, Some(*code), now_ms)
            }
            Err(ExchangeError::Transient { .. }) => {}
        }
        result
    }

    async fn open_on_exchange(&mut self, position: &Position, now_ms: i64) -> Result<(), ExchangeError> {
        let leverage = self.ensure_leverage(&position.symbol, position.side, now_ms).await?;
        let exchange = &self.exchange;
        let ack = with_retry(&self.options.retry, "place_order", || {
            exchange.place_order(&position.symbol, position.side, position.size_usd, leverage, false)
        })
        .await?;
        info!(
            symbol = position.symbol.as_str(),
            order_id = ack.order_id.as_str(),
            fill_price = ack.fill_price,
            "entry order filled"
        );
        Ok(())
    }

    async fn close_on_exchange(&self, trade: &Trade) {
        let exchange = &self.exchange;
        let leverage = self.sim.strategy().leverage();
        let result = with_retry(&self.options.retry, "place_order", || {
            exchange.place_order(&trade.symbol, trade.side.opposite(), trade.size_usd, leverage, true)
        })
        .await;
        if let Err(err) = result {
            // the ledger already settled this trade
            error!(symbol = trade.symbol.as_str(), id = trade.id, %err, "exit order failed");
        }
    }

    async fn persist(&self) {
        let positions = self.sim.ledger().snapshot();
        let leverage = self.sim.registry().leverage_cache().entries();
        let store = Arc::clone(&self.store);
        let written = tokio::task::spawn_blocking(move || {
            store.save_positions(&positions)?;
            store.save_leverage_cache(&leverage)
        })
        .await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%err, "state flush failed, retrying next tick"),
            Err(err) => warn!(%err, "state flush task failed, retrying next tick"),
        }
    }

    async fn shutdown(mut self) -> Result<SessionSummary, TraderError> {
        self.sim.stop_admitting();
        info!(open = self.sim.ledger().len(), "stopping live session");

        if self.options.close_on_stop {
            let closed = self.sim.close_all(self.last_tick_ms, ExitReason::Shutdown);
            for trade in &closed {
                self.close_on_exchange(trade).await;
            }
        }

        let summary = SessionSummary {
            ticks: self.ticks,
            capital: self.sim.capital(),
            trades: self.sim.trades().to_vec(),
            open_positions: self.sim.ledger().snapshot(),
        };

        let LiveSession {
            sim,
            exchange,
            store,
            ..
        } = self;
        let (registry, positions) = sim.into_registry();
        let flushed = tokio::task::spawn_blocking(move || registry.flush_and_close(&positions, store.as_ref()))
            .await
            .map_err(|err| TraderError::Persistence {
                reason: format!("state flush task failed: {err}"),
            })
            .and_then(|flushed| flushed);

        if let Err(err) = exchange.close().await {
            error!(%err, "exchange close failed");
        }
        flushed?;
        info!(capital = summary.capital, trades = summary.trades.len(), "live session stopped");
        Ok(summary)
    }
}
