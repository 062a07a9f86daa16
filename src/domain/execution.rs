//! Exit evaluation, fill costs and entry sizing.
//!
//! Exits are checked in a fixed order and the first match wins:
//! hard stop-loss, take-profit (unless trailing-only), trailing breach,
//! then reversal on a strong opposing signal. Realized PnL is the leveraged
//! price move less fees and slippage on both legs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::error::SizingError;
use super::position::{ExitReason, Position, Trade, EPS};
use super::signal::Signal;
use super::strategy::StrategyConfig;

/// Share of free capital a single entry may take.
pub const FREE_CAPITAL_USAGE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeeSchedule {
    pub maker_rate: f64,
    pub taker_rate: f64,
    /// Chance that a leg fills as maker.
    pub maker_fill_probability: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            maker_rate: 0.0002,
            taker_rate: 0.0005,
            maker_fill_probability: 0.5,
        }
    }
}

impl FeeSchedule {
    fn fill_probability(&self) -> f64 {
        self.maker_fill_probability.clamp(0.0, 1.0)
    }

    /// Probability-weighted rate of one leg.
    pub fn expected_rate(&self) -> f64 {
        let p = self.fill_probability();
        p * self.maker_rate + (1.0 - p) * self.taker_rate
    }

    /// Expected rate of an entry plus an exit.
    pub fn round_trip_rate(&self) -> f64 {
        2.0 * self.expected_rate()
    }
}

/// How the maker/taker outcome of each leg is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeMode {
    /// Charge the expected blend on every leg.
    Expected,
    /// Draw maker or taker per leg from a PRNG with a fixed seed.
    Seeded { seed: u64 },
}

#[derive(Debug, Clone)]
pub struct FeeModel {
    schedule: FeeSchedule,
    rng: Option<StdRng>,
}

impl FeeModel {
    pub fn new(schedule: FeeSchedule, mode: FeeMode) -> Self {
        let rng = match mode {
            FeeMode::Expected => None,
            FeeMode::Seeded { seed } => Some(StdRng::seed_from_u64(seed)),
        };
        FeeModel { schedule, rng }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    pub fn leg_rate(&mut self) -> f64 {
        let p = self.schedule.fill_probability();
        match self.rng.as_mut() {
            None => self.schedule.expected_rate(),
            Some(rng) => {
                if rng.gen_bool(p) {
                    self.schedule.maker_rate
                } else {
                    self.schedule.taker_rate
                }
            }
        }
    }
}

/// Size-dependent slippage in basis points per leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlippageModel {
    pub base_bps: f64,
    /// Added at 100% participation, scaled by its square root.
    pub impact_bps: f64,
    pub max_bps: f64,
}

impl Default for SlippageModel {
    fn default() -> Self {
        SlippageModel {
            base_bps: 1.0,
            impact_bps: 5.0,
            max_bps: 20.0,
        }
    }
}

impl SlippageModel {
    /// Grows with notional relative to recent traded value and shrinks when
    /// volume runs above its average.
    pub fn slippage_bps(&self, notional: f64, fill: &FillContext) -> f64 {
        let participation = if fill.recent_traded_value > 0.0 {
            notional / fill.recent_traded_value
        } else {
            1.0
        };
        let volume_factor = fill.volume_ratio.clamp(0.25, 4.0);
        let bps = (self.base_bps + self.impact_bps * participation.max(0.0).sqrt()) / volume_factor;
        bps.min(self.max_bps)
    }
}

/// Market conditions at fill time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillContext {
    /// Quote value traded over the recent window.
    pub recent_traded_value: f64,
    /// Current volume over its rolling average.
    pub volume_ratio: f64,
}

impl Default for FillContext {
    fn default() -> Self {
        FillContext {
            recent_traded_value: 0.0,
            volume_ratio: 1.0,
        }
    }
}

/// Fees and slippage charged when a position is settled.
#[derive(Debug, Clone)]
pub struct CostModel {
    fees: FeeModel,
    slippage: SlippageModel,
}

impl CostModel {
    pub fn new(fees: FeeModel, slippage: SlippageModel) -> Self {
        CostModel { fees, slippage }
    }

    pub fn fee_schedule(&self) -> &FeeSchedule {
        self.fees.schedule()
    }

    /// Closes `position` at `exit_price` and produces its trade record.
    pub fn settle(
        &mut self,
        position: &Position,
        exit_price: f64,
        exit_time: i64,
        exit_reason: ExitReason,
        fill: &FillContext,
    ) -> Trade {
        let notional = position.notional();
        let gross_pnl_usd = position.price_change_pct(exit_price) * notional;

        let entry_rate = self.fees.leg_rate();
        let exit_rate = self.fees.leg_rate();
        let fees_usd = notional * (entry_rate + exit_rate);

        let slippage_bps = self.slippage.slippage_bps(notional, fill);
        let slippage_usd = 2.0 * notional * slippage_bps / 10_000.0;

        let pnl_usd = gross_pnl_usd - fees_usd - slippage_usd;
        let pnl_pct = if position.size_usd > 0.0 {
            pnl_usd / position.size_usd
        } else {
            0.0
        };

        Trade {
            id: position.id,
            symbol: position.symbol.clone(),
            side: position.side,
            entry_price: position.entry_price,
            entry_time: position.entry_time,
            exit_price,
            exit_time,
            size_usd: position.size_usd,
            leverage: position.leverage,
            gross_pnl_usd,
            pnl_usd,
            pnl_pct,
            fees_usd,
            slippage_usd,
            exit_reason,
        }
    }
}

/// Decides whether an open position should be closed at a given price.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitEvaluator {
    stop_loss_pct: f64,
    take_profit_pct: f64,
    trailing_only: bool,
    trailing_callback: f64,
    reversal_threshold: f64,
}

impl ExitEvaluator {
    pub fn new(config: &StrategyConfig) -> Self {
        ExitEvaluator {
            stop_loss_pct: config.stop_loss_pct(),
            take_profit_pct: config.take_profit_pct(),
            trailing_only: config.trailing_only(),
            trailing_callback: config.trailing_callback(),
            reversal_threshold: config.reversal_threshold(),
        }
    }

    /// `position` should already be marked to `price`. Closed positions
    /// never produce an exit.
    pub fn evaluate(
        &self,
        position: &Position,
        price: f64,
        signal: Option<&Signal>,
    ) -> Option<ExitReason> {
        if position.is_closed() {
            return None;
        }

        let roc = position.return_on_capital(price);
        if roc <= -self.stop_loss_pct + EPS {
            return Some(ExitReason::StopLoss);
        }
        if !self.trailing_only && roc >= self.take_profit_pct - EPS {
            return Some(ExitReason::TakeProfit);
        }
        if position.trailing_breached(price, self.trailing_callback) {
            return Some(ExitReason::TrailingTp);
        }
        if let Some(signal) = signal {
            let opposing = signal.direction.side() == Some(position.side.opposite());
            if opposing && signal.score >= self.reversal_threshold {
                return Some(ExitReason::Reversal);
            }
        }
        None
    }
}

/// Margin for a new entry: the configured share of capital, limited to 90%
/// of what is not already committed.
pub fn size_entry(capital: f64, allocated: f64, position_size_pct: f64) -> Result<f64, SizingError> {
    let requested = capital * position_size_pct;
    if requested <= 0.0 || !requested.is_finite() {
        return Err(SizingError::NonPositive { requested });
    }
    let free = (capital - allocated) * FREE_CAPITAL_USAGE;
    if free <= 0.0 {
        return Err(SizingError::NoFreeCapital { capital, allocated });
    }
    Ok(requested.min(free))
}
