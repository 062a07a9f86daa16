//! Multi-gate signal scorer.
//!
//! A candidate direction comes from multi-horizon return agreement and then
//! has to survive every gate in order. The first failing gate produces a
//! neutral signal carrying its [`VetoReason`]:
//!
//! 0. history length
//! 1. horizon confluence
//! 2. confluence strength
//! 3. fee viability
//! 4. volume
//! 5. spread
//! 6. momentum
//! 7. indicator confluence
//! 8. market structure
//! 9. composite score blended with a UCB exploration term
//! 10. quality grade (only A passes, and doubles the score)
//! 11. entry threshold

use super::candle::Candle;
use super::execution::FeeSchedule;
use super::features::FeatureSet;
use super::indicator::{mean, order_flow_from_book, TrendDirection};
use super::signal::{Direction, Grade, Signal, SignalMetadata, VetoReason};
use super::strategy::StrategyConfig;
use super::structure::{detect_structure, KeyLevels, MarketStructure};
use super::symbol_state::SymbolState;

/// Composite-score weights. They sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWeights {
    pub momentum: f64,
    pub rsi: f64,
    pub macd: f64,
    pub bollinger: f64,
    pub ema: f64,
    pub vwap: f64,
    pub order_book: f64,
    pub volatility: f64,
    pub spread: f64,
    pub funding: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            momentum: 0.25,
            rsi: 0.10,
            macd: 0.10,
            bollinger: 0.10,
            ema: 0.10,
            vwap: 0.10,
            order_book: 0.10,
            volatility: 0.05,
            spread: 0.05,
            funding: 0.05,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.momentum
            + self.rsi
            + self.macd
            + self.bollinger
            + self.ema
            + self.vwap
            + self.order_book
            + self.volatility
            + self.spread
            + self.funding
    }
}

/// Tunable scorer constants.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerParams {
    /// Return horizons in candles.
    pub horizons: Vec<usize>,
    pub min_history: usize,
    pub min_confluence_strength: f64,
    /// Candles in the rolling volume average.
    pub volume_lookback: usize,
    pub max_spread_bps: f64,
    /// Share of the candle's high-low range taken as the spread when no book
    /// quote is available.
    pub spread_range_fraction: f64,
    pub min_momentum: f64,
    /// Momentum that earns the full momentum component.
    pub momentum_scale: f64,
    /// ATR band, as a fraction of price, that counts as a good volatility fit.
    pub min_atr_pct: f64,
    pub max_atr_pct: f64,
    /// Funding rate that fully saturates the funding component.
    pub funding_scale: f64,
    pub strong_confluence_votes: usize,
    pub risk_reward_target: f64,
    pub level_lookback: usize,
    pub level_tolerance: f64,
    pub exploration_weight: f64,
    pub exploration_c: f64,
    pub weights: ScoreWeights,
}

impl Default for ScorerParams {
    fn default() -> Self {
        ScorerParams {
            horizons: vec![1, 3, 5, 10, 20],
            min_history: 20,
            min_confluence_strength: 0.001,
            volume_lookback: 20,
            max_spread_bps: 10.0,
            spread_range_fraction: 0.1,
            min_momentum: 0.0005,
            momentum_scale: 0.005,
            min_atr_pct: 0.001,
            max_atr_pct: 0.02,
            funding_scale: 0.001,
            strong_confluence_votes: 3,
            risk_reward_target: 1.5,
            level_lookback: 20,
            level_tolerance: 0.005,
            exploration_weight: 0.1,
            exploration_c: 0.5,
            weights: ScoreWeights::default(),
        }
    }
}

/// Returns over each horizon that has enough history, shortest first.
fn horizon_returns(window: &[Candle], horizons: &[usize]) -> Vec<f64> {
    let Some(last) = window.last() else {
        return Vec::new();
    };
    let mut sorted = horizons.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .into_iter()
        .filter(|&h| h > 0 && window.len() > h)
        .filter_map(|h| {
            let base = window[window.len() - 1 - h].close;
            (base > 0.0).then(|| (last.close - base) / base)
        })
        .collect()
}

/// Reward to the next opposing level over the stop distance, both as
/// fractions of `price`. At or through the level the measured move (the
/// height of the range) is the target instead. `giveback` is what a trailing
/// exit surrenders behind the peak.
fn setup_risk_reward(
    direction: Direction,
    price: f64,
    levels: &KeyLevels,
    tolerance: f64,
    stop_distance: f64,
    giveback: f64,
) -> f64 {
    if price <= 0.0 || stop_distance <= 0.0 {
        return 0.0;
    }
    let room = match direction {
        Direction::Long => (levels.resistance - price) / price,
        Direction::Short => (price - levels.support) / price,
        Direction::Neutral => return 0.0,
    };
    let target = if room > tolerance {
        room
    } else {
        (levels.resistance - levels.support) / price
    };
    ((target - giveback) / stop_distance).max(0.0)
}

/// Agreement needed from `available` horizons: all of them up to three.
fn required_agreement(available: usize) -> usize {
    available.min(3)
}

#[derive(Debug, Clone)]
pub struct Scorer {
    params: ScorerParams,
    entry_threshold: f64,
    volume_ratio: f64,
    confluence_required: usize,
    leverage: f64,
    /// Stop-loss distance as a fraction of price.
    stop_distance: f64,
    /// Price fraction a trailing-only exit gives back from the peak.
    trailing_giveback: f64,
    round_trip_fee: f64,
}

impl Scorer {
    pub fn new(params: ScorerParams, strategy: &StrategyConfig, fees: &FeeSchedule) -> Self {
        Scorer {
            params,
            entry_threshold: strategy.entry_threshold(),
            volume_ratio: strategy.volume_ratio(),
            confluence_required: strategy.confluence_required(),
            leverage: strategy.leverage_f64(),
            stop_distance: strategy.stop_loss_price_pct(),
            trailing_giveback: if strategy.trailing_only() {
                strategy.trailing_callback() / strategy.leverage_f64()
            } else {
                0.0
            },
            round_trip_fee: fees.round_trip_rate(),
        }
    }

    pub fn params(&self) -> &ScorerParams {
        &self.params
    }

    pub fn score(&self, state: &SymbolState, features: &FeatureSet) -> Signal {
        let p = &self.params;
        let window = state.window();
        let mut meta = SignalMetadata::default();

        // 0
        let Some(last) = window.last() else {
            return Signal::neutral(VetoReason::InsufficientHistory, meta);
        };
        if window.len() < p.min_history {
            return Signal::neutral(VetoReason::InsufficientHistory, meta);
        }

        // 1
        let returns = horizon_returns(window, &p.horizons);
        let up = returns.iter().filter(|&&r| r > 0.0).count();
        let down = returns.iter().filter(|&&r| r < 0.0).count();
        let required = required_agreement(returns.len());
        let direction = if required > 0 && up >= required && up > down {
            Direction::Long
        } else if required > 0 && down >= required && down > up {
            Direction::Short
        } else {
            return Signal::neutral(VetoReason::NoConfluence, meta);
        };
        let sign = direction.sign();
        let agreeing: Vec<f64> = returns
            .iter()
            .copied()
            .filter(|r| r * sign > 0.0)
            .collect();
        meta.agreeing_horizons = agreeing.len();

        // 2
        let strength = mean(&agreeing.iter().map(|r| r.abs()).collect::<Vec<_>>());
        meta.confluence_strength = strength;
        if strength <= p.min_confluence_strength {
            return Signal::neutral(VetoReason::WeakConfluence, meta);
        }

        // 3
        if strength * self.leverage <= 2.0 * self.round_trip_fee {
            return Signal::neutral(VetoReason::ProfitBelowFees, meta);
        }

        // 4
        let volume_ratio = state.volume_ratio(p.volume_lookback);
        meta.volume_ratio = volume_ratio;
        if volume_ratio <= self.volume_ratio {
            return Signal::neutral(VetoReason::InsufficientVolume, meta);
        }

        // 5
        let spread_bps = match state.book() {
            Some(book) => book.spread_bps(),
            None if last.close > 0.0 => {
                (last.high - last.low) / last.close * p.spread_range_fraction * 10_000.0
            }
            None => f64::INFINITY,
        };
        meta.spread_bps = spread_bps;
        if spread_bps >= p.max_spread_bps {
            return Signal::neutral(VetoReason::WideSpread, meta);
        }

        // 6
        let momentum = returns[0];
        if momentum.abs() < p.min_momentum || momentum * sign <= 0.0 {
            return Signal::neutral(VetoReason::WeakMomentum, meta);
        }

        // 7
        let votes = self.indicator_votes(direction, features);
        meta.indicator_votes = votes;
        if votes < self.confluence_required {
            return Signal::neutral(VetoReason::InsufficientIndicatorConfluence, meta);
        }

        // 8
        let structure = detect_structure(window, p.level_lookback);
        meta.structure = Some(structure);
        let against = matches!(
            (direction, structure),
            (Direction::Long, MarketStructure::Downtrend) | (Direction::Short, MarketStructure::Uptrend)
        );
        if against {
            return Signal::neutral(VetoReason::AgainstStructure, meta);
        }

        // 9
        let composite = self.composite(direction, state, features, momentum, spread_bps);
        let strength_boost = 1.0 + (strength * 100.0).min(1.0) * 0.5;
        let volume_boost = 1.0 + (volume_ratio - self.volume_ratio).clamp(0.0, 1.0) * 0.25;
        let raw = (composite * 100.0 * strength_boost * volume_boost).min(100.0);
        meta.raw_score = raw;
        let w = p.exploration_weight.clamp(0.0, 1.0);
        let mut score = (1.0 - w) * raw + w * self.exploration_term(state);

        // 10
        let trend_aligned = matches!(
            (direction, features.adx.direction()),
            (Direction::Long, TrendDirection::Bullish) | (Direction::Short, TrendDirection::Bearish)
        );
        let levels = KeyLevels::from_window(window, p.level_lookback);
        let at_level = levels.as_ref().is_some_and(|levels| {
            levels.near_support(last.close, p.level_tolerance)
                || levels.near_resistance(last.close, p.level_tolerance)
        });
        let risk_reward = levels.as_ref().map_or(0.0, |levels| {
            setup_risk_reward(
                direction,
                last.close,
                levels,
                p.level_tolerance,
                self.stop_distance,
                self.trailing_giveback,
            )
        });
        meta.risk_reward = risk_reward;
        let rr_ok = risk_reward >= p.risk_reward_target;
        let strong_votes = votes >= p.strong_confluence_votes;
        let passed = [trend_aligned, at_level, rr_ok, strong_votes]
            .iter()
            .filter(|&&check| check)
            .count();
        let grade = Grade::from_checks(passed);
        meta.grade = Some(grade);
        if grade != Grade::A {
            return Signal::neutral(VetoReason::NotAGrade, meta);
        }
        score *= 2.0;

        // 11
        if score <= self.entry_threshold {
            return Signal::neutral(VetoReason::LowScore, meta);
        }

        Signal {
            direction,
            score,
            metadata: meta,
        }
    }

    /// Momentum always votes for the candidate; the rest vote when they agree.
    fn indicator_votes(&self, direction: Direction, f: &FeatureSet) -> usize {
        let long = direction == Direction::Long;
        let checks = [
            true,
            if long { f.rsi.oversold() } else { f.rsi.overbought() },
            if long { f.macd.bullish() } else { f.macd.bearish() },
            if long {
                f.bollinger.touches_lower()
            } else {
                f.bollinger.touches_upper()
            },
            if long { f.ema.bullish() } else { f.ema.bearish() },
            if long {
                f.vwap.price_above()
            } else {
                f.vwap.price_below()
            },
        ];
        checks.iter().filter(|&&agrees| agrees).count()
    }

    /// Weighted sum of directional components, each in [0, 1].
    fn composite(
        &self,
        direction: Direction,
        state: &SymbolState,
        f: &FeatureSet,
        momentum: f64,
        spread_bps: f64,
    ) -> f64 {
        let p = &self.params;
        let w = &p.weights;
        let sign = direction.sign();
        let long = direction == Direction::Long;

        let momentum_c = if p.momentum_scale > 0.0 {
            (momentum.abs() / p.momentum_scale).min(1.0)
        } else {
            1.0
        };
        let rsi_c = if long {
            1.0 - f.rsi.value / 100.0
        } else {
            f.rsi.value / 100.0
        };
        let macd_c = if (long && f.macd.bullish()) || (!long && f.macd.bearish()) {
            1.0
        } else if f.macd.histogram * sign > 0.0 {
            0.5
        } else {
            0.0
        };
        let bollinger_c = if long {
            (1.0 - f.bollinger.percent_b).clamp(0.0, 1.0)
        } else {
            f.bollinger.percent_b.clamp(0.0, 1.0)
        };
        let ema_c = if (long && f.ema.bullish()) || (!long && f.ema.bearish()) {
            0.5 + (f.ema.spread_pct().abs() * 100.0).min(0.5)
        } else {
            0.0
        };
        let vwap_c = if (long && f.vwap.price_above()) || (!long && f.vwap.price_below()) {
            1.0
        } else {
            0.0
        };
        let imbalance = match state.book() {
            Some(book) => order_flow_from_book(book.bid_volume, book.ask_volume).imbalance,
            None => f.order_flow.imbalance,
        };
        let book_c = ((1.0 + sign * imbalance) / 2.0).clamp(0.0, 1.0);
        let volatility_c = if !f.atr.valid {
            0.5
        } else if (p.min_atr_pct..=p.max_atr_pct).contains(&f.atr.atr_pct) {
            1.0
        } else {
            0.25
        };
        let spread_c = if p.max_spread_bps > 0.0 {
            (1.0 - spread_bps / p.max_spread_bps).clamp(0.0, 1.0)
        } else {
            0.0
        };
        // Positive funding is paid by longs.
        let funding_c = if p.funding_scale > 0.0 {
            (0.5 - 0.5 * sign * state.funding_rate() / p.funding_scale).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let sum = w.momentum * momentum_c
            + w.rsi * rsi_c
            + w.macd * macd_c
            + w.bollinger * bollinger_c
            + w.ema * ema_c
            + w.vwap * vwap_c
            + w.order_book * book_c
            + w.volatility * volatility_c
            + w.spread * spread_c
            + w.funding * funding_c;
        let total = w.total();
        if total > 0.0 { sum / total } else { 0.0 }
    }

    /// Upper-confidence-bound term in [0, 100] from the symbol's trade
    /// history. Untried symbols get the largest bonus.
    fn exploration_term(&self, state: &SymbolState) -> f64 {
        let exploit = 50.0 * (1.0 + (state.mean_reward() * 10.0).tanh());
        let bonus = 100.0 * self.params.exploration_c / f64::from(state.trade_count() + 1).sqrt();
        (exploit + bonus).min(100.0)
    }
}
