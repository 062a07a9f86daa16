//! Strategy and simulation configuration.
//!
//! [`StrategyConfig`] is immutable once built. It can only be obtained from
//! [`StrategyConfigBuilder::build`] or [`StrategyConfig::from_port`], both of
//! which reject missing required fields and out-of-range values up front.

use serde::Serialize;

use crate::domain::config_validation::{
    fraction, non_negative, positive, probability, read_bool, read_f64, read_u64,
};
use crate::domain::error::TraderError;
use crate::domain::execution::{FeeMode, FeeSchedule, SlippageModel};
use crate::ports::config_port::ConfigPort;

const STRATEGY: &str = "strategy";
const SIMULATION: &str = "simulation";

pub const DEFAULT_ENTRY_THRESHOLD: f64 = 1.5;
pub const DEFAULT_TAKE_PROFIT_PCT: f64 = 0.5;
pub const DEFAULT_TRAILING_CALLBACK: f64 = 0.05;
pub const DEFAULT_TRAILING_ACTIVATION: f64 = 0.16;
pub const DEFAULT_VOLUME_RATIO: f64 = 0.8;
pub const DEFAULT_CONFLUENCE_REQUIRED: usize = 2;
pub const DEFAULT_MAX_CONCENTRATION: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    entry_threshold: f64,
    stop_loss_pct: f64,
    take_profit_pct: f64,
    trailing_callback: f64,
    trailing_activation: f64,
    trailing_only: bool,
    volume_ratio: f64,
    confluence_required: usize,
    position_size_pct: f64,
    leverage: u32,
    max_positions: usize,
    min_liquidity: f64,
}

impl StrategyConfig {
    pub fn builder() -> StrategyConfigBuilder {
        StrategyConfigBuilder::default()
    }

    /// Reads the `[strategy]` section.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let mut builder = StrategyConfig::builder();

        if let Some(v) = read_f64(config, STRATEGY, "entry_threshold")? {
            builder = builder.entry_threshold(v);
        }
        if let Some(v) = read_f64(config, STRATEGY, "stop_loss_pct")? {
            builder = builder.stop_loss_pct(v);
        }
        if let Some(v) = read_f64(config, STRATEGY, "take_profit_pct")? {
            builder = builder.take_profit_pct(v);
        }
        if let Some(v) = read_f64(config, STRATEGY, "trailing_callback")? {
            builder = builder.trailing_callback(v);
        }
        if let Some(v) = read_f64(config, STRATEGY, "trailing_activation")? {
            builder = builder.trailing_activation(v);
        }
        if let Some(v) = read_bool(config, STRATEGY, "trailing_only")? {
            builder = builder.trailing_only(v);
        }
        if let Some(v) = read_f64(config, STRATEGY, "volume_ratio")? {
            builder = builder.volume_ratio(v);
        }
        if let Some(v) = read_u64(config, STRATEGY, "confluence_required")? {
            let required = usize::try_from(v).map_err(|_| {
                TraderError::invalid(STRATEGY, "confluence_required", "confluence_required is too large")
            })?;
            builder = builder.confluence_required(required);
        }
        if let Some(v) = read_f64(config, STRATEGY, "position_size_pct")? {
            builder = builder.position_size_pct(v);
        }
        if let Some(v) = read_u64(config, STRATEGY, "leverage")? {
            let leverage = u32::try_from(v)
                .map_err(|_| TraderError::invalid(STRATEGY, "leverage", "leverage is too large"))?;
            builder = builder.leverage(leverage);
        }
        if let Some(v) = read_u64(config, STRATEGY, "max_positions")? {
            let max_positions = usize::try_from(v).map_err(|_| {
                TraderError::invalid(STRATEGY, "max_positions", "max_positions is too large")
            })?;
            builder = builder.max_positions(max_positions);
        }
        if let Some(v) = read_f64(config, STRATEGY, "min_liquidity")? {
            builder = builder.min_liquidity(v);
        }

        builder.build()
    }

    pub fn entry_threshold(&self) -> f64 {
        self.entry_threshold
    }

    /// Loss limit as a fraction of margin.
    pub fn stop_loss_pct(&self) -> f64 {
        self.stop_loss_pct
    }

    pub fn take_profit_pct(&self) -> f64 {
        self.take_profit_pct
    }

    pub fn trailing_callback(&self) -> f64 {
        self.trailing_callback
    }

    pub fn trailing_activation(&self) -> f64 {
        self.trailing_activation
    }

    pub fn trailing_only(&self) -> bool {
        self.trailing_only
    }

    pub fn volume_ratio(&self) -> f64 {
        self.volume_ratio
    }

    pub fn confluence_required(&self) -> usize {
        self.confluence_required
    }

    pub fn position_size_pct(&self) -> f64 {
        self.position_size_pct
    }

    pub fn leverage(&self) -> u32 {
        self.leverage
    }

    pub fn leverage_f64(&self) -> f64 {
        f64::from(self.leverage)
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    pub fn min_liquidity(&self) -> f64 {
        self.min_liquidity
    }

    /// Stop-loss distance as a fraction of price.
    pub fn stop_loss_price_pct(&self) -> f64 {
        self.stop_loss_pct / self.leverage_f64()
    }

    pub fn take_profit_price_pct(&self) -> f64 {
        self.take_profit_pct / self.leverage_f64()
    }

    /// Score an opposing signal needs to force a reversal exit.
    pub fn reversal_threshold(&self) -> f64 {
        1.5 * self.entry_threshold
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyConfigBuilder {
    entry_threshold: Option<f64>,
    stop_loss_pct: Option<f64>,
    take_profit_pct: Option<f64>,
    trailing_callback: Option<f64>,
    trailing_activation: Option<f64>,
    trailing_only: Option<bool>,
    volume_ratio: Option<f64>,
    confluence_required: Option<usize>,
    position_size_pct: Option<f64>,
    leverage: Option<u32>,
    max_positions: Option<usize>,
    min_liquidity: Option<f64>,
}

impl StrategyConfigBuilder {
    pub fn entry_threshold(mut self, value: f64) -> Self {
        self.entry_threshold = Some(value);
        self
    }

    pub fn stop_loss_pct(mut self, value: f64) -> Self {
        self.stop_loss_pct = Some(value);
        self
    }

    pub fn take_profit_pct(mut self, value: f64) -> Self {
        self.take_profit_pct = Some(value);
        self
    }

    pub fn trailing_callback(mut self, value: f64) -> Self {
        self.trailing_callback = Some(value);
        self
    }

    pub fn trailing_activation(mut self, value: f64) -> Self {
        self.trailing_activation = Some(value);
        self
    }

    pub fn trailing_only(mut self, value: bool) -> Self {
        self.trailing_only = Some(value);
        self
    }

    pub fn volume_ratio(mut self, value: f64) -> Self {
        self.volume_ratio = Some(value);
        self
    }

    pub fn confluence_required(mut self, value: usize) -> Self {
        self.confluence_required = Some(value);
        self
    }

    pub fn position_size_pct(mut self, value: f64) -> Self {
        self.position_size_pct = Some(value);
        self
    }

    pub fn leverage(mut self, value: u32) -> Self {
        self.leverage = Some(value);
        self
    }

    pub fn max_positions(mut self, value: usize) -> Self {
        self.max_positions = Some(value);
        self
    }

    pub fn min_liquidity(mut self, value: f64) -> Self {
        self.min_liquidity = Some(value);
        self
    }

    pub fn build(self) -> Result<StrategyConfig, TraderError> {
        let leverage = self
            .leverage
            .ok_or_else(|| TraderError::missing(STRATEGY, "leverage"))?;
        if leverage == 0 {
            return Err(TraderError::invalid(
                STRATEGY,
                "leverage",
                "leverage must be at least 1",
            ));
        }

        let stop_loss_pct = positive(
            STRATEGY,
            "stop_loss_pct",
            self.stop_loss_pct
                .ok_or_else(|| TraderError::missing(STRATEGY, "stop_loss_pct"))?,
        )?;
        if stop_loss_pct / f64::from(leverage) >= 1.0 {
            return Err(TraderError::invalid(
                STRATEGY,
                "stop_loss_pct",
                "stop_loss_pct / leverage must be below 1",
            ));
        }

        let position_size_pct = fraction(
            STRATEGY,
            "position_size_pct",
            self.position_size_pct
                .ok_or_else(|| TraderError::missing(STRATEGY, "position_size_pct"))?,
        )?;

        let max_positions = self
            .max_positions
            .ok_or_else(|| TraderError::missing(STRATEGY, "max_positions"))?;
        if max_positions == 0 {
            return Err(TraderError::invalid(
                STRATEGY,
                "max_positions",
                "max_positions must be at least 1",
            ));
        }

        let confluence_required = self
            .confluence_required
            .unwrap_or(DEFAULT_CONFLUENCE_REQUIRED);
        if confluence_required == 0 {
            return Err(TraderError::invalid(
                STRATEGY,
                "confluence_required",
                "confluence_required must be at least 1",
            ));
        }

        Ok(StrategyConfig {
            entry_threshold: non_negative(
                STRATEGY,
                "entry_threshold",
                self.entry_threshold.unwrap_or(DEFAULT_ENTRY_THRESHOLD),
            )?,
            stop_loss_pct,
            take_profit_pct: positive(
                STRATEGY,
                "take_profit_pct",
                self.take_profit_pct.unwrap_or(DEFAULT_TAKE_PROFIT_PCT),
            )?,
            trailing_callback: positive(
                STRATEGY,
                "trailing_callback",
                self.trailing_callback.unwrap_or(DEFAULT_TRAILING_CALLBACK),
            )?,
            trailing_activation: positive(
                STRATEGY,
                "trailing_activation",
                self.trailing_activation.unwrap_or(DEFAULT_TRAILING_ACTIVATION),
            )?,
            trailing_only: self.trailing_only.unwrap_or(false),
            volume_ratio: non_negative(
                STRATEGY,
                "volume_ratio",
                self.volume_ratio.unwrap_or(DEFAULT_VOLUME_RATIO),
            )?,
            confluence_required,
            position_size_pct,
            leverage,
            max_positions,
            min_liquidity: non_negative(
                STRATEGY,
                "min_liquidity",
                self.min_liquidity.unwrap_or(0.0),
            )?,
        })
    }
}

/// Account-level parameters of a simulated run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    pub fees: FeeSchedule,
    pub fee_mode: FeeMode,
    pub slippage: SlippageModel,
    pub max_concentration: f64,
}

impl SimulationConfig {
    pub fn new(initial_capital: f64) -> Self {
        SimulationConfig {
            initial_capital,
            fees: FeeSchedule::default(),
            fee_mode: FeeMode::Expected,
            slippage: SlippageModel::default(),
            max_concentration: DEFAULT_MAX_CONCENTRATION,
        }
    }

    /// Reads the `[simulation]` section.
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, TraderError> {
        let initial_capital = positive(
            SIMULATION,
            "initial_capital",
            read_f64(config, SIMULATION, "initial_capital")?
                .ok_or_else(|| TraderError::missing(SIMULATION, "initial_capital"))?,
        )?;

        let defaults = FeeSchedule::default();
        let fees = FeeSchedule {
            maker_rate: non_negative(
                SIMULATION,
                "maker_rate",
                read_f64(config, SIMULATION, "maker_rate")?.unwrap_or(defaults.maker_rate),
            )?,
            taker_rate: non_negative(
                SIMULATION,
                "taker_rate",
                read_f64(config, SIMULATION, "taker_rate")?.unwrap_or(defaults.taker_rate),
            )?,
            maker_fill_probability: probability(
                SIMULATION,
                "maker_fill_probability",
                read_f64(config, SIMULATION, "maker_fill_probability")?
                    .unwrap_or(defaults.maker_fill_probability),
            )?,
        };

        let fee_mode = match read_u64(config, SIMULATION, "fee_seed")? {
            Some(seed) => FeeMode::Seeded { seed },
            None => FeeMode::Expected,
        };

        let slip = SlippageModel::default();
        let slippage = SlippageModel {
            base_bps: non_negative(
                SIMULATION,
                "slippage_base_bps",
                read_f64(config, SIMULATION, "slippage_base_bps")?.unwrap_or(slip.base_bps),
            )?,
            impact_bps: non_negative(
                SIMULATION,
                "slippage_impact_bps",
                read_f64(config, SIMULATION, "slippage_impact_bps")?.unwrap_or(slip.impact_bps),
            )?,
            max_bps: non_negative(
                SIMULATION,
                "slippage_max_bps",
                read_f64(config, SIMULATION, "slippage_max_bps")?.unwrap_or(slip.max_bps),
            )?,
        };

        let max_concentration = fraction(
            SIMULATION,
            "max_concentration",
            read_f64(config, SIMULATION, "max_concentration")?
                .unwrap_or(DEFAULT_MAX_CONCENTRATION),
        )?;

        Ok(SimulationConfig {
            initial_capital,
            fees,
            fee_mode,
            slippage,
            max_concentration,
        })
    }

    pub fn with_fee_mode(self, fee_mode: FeeMode) -> Self {
        SimulationConfig { fee_mode, ..self }
    }

    /// Same account without fees or slippage.
    pub fn frictionless(self) -> Self {
        SimulationConfig {
            fees: FeeSchedule {
                maker_rate: 0.0,
                taker_rate: 0.0,
                maker_fill_probability: self.fees.maker_fill_probability,
            },
            slippage: SlippageModel {
                base_bps: 0.0,
                impact_bps: 0.0,
                max_bps: 0.0,
            },
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn minimal() -> StrategyConfigBuilder {
        StrategyConfig::builder()
            .leverage(25)
            .stop_loss_pct(0.45)
            .position_size_pct(0.1)
            .max_positions(5)
    }

    #[test]
    fn builder_applies_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.trailing_activation(), 0.16);
        assert!(!config.trailing_only());
        assert_eq!(config.min_liquidity(), 0.0);
        assert_eq!(config.entry_threshold(), DEFAULT_ENTRY_THRESHOLD);
        assert_eq!(config.confluence_required(), DEFAULT_CONFLUENCE_REQUIRED);
        assert_eq!(config.volume_ratio(), 0.8);
    }

    #[test]
    fn builder_requires_leverage() {
        let err = StrategyConfig::builder()
            .stop_loss_pct(0.45)
            .position_size_pct(0.1)
            .max_positions(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, TraderError::ConfigMissing { ref key, .. } if key == "leverage"));
    }

    #[test]
    fn builder_rejects_zero_max_positions() {
        let err = minimal().max_positions(0).build().unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { ref key, .. } if key == "max_positions"));
    }

    #[test]
    fn builder_rejects_oversized_position() {
        assert!(minimal().position_size_pct(1.5).build().is_err());
    }

    #[test]
    fn stop_loss_converts_to_price_fraction() {
        let config = minimal().build().unwrap();
        assert!((config.stop_loss_price_pct() - 0.018).abs() < 1e-12);
        assert!((config.take_profit_price_pct() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn from_port_reads_strategy_section() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nleverage = 10\nstop_loss_pct = 0.3\nposition_size_pct = 0.2\n\
             max_positions = 3\ntrailing_only = true\nconfluence_required = 4\n",
        )
        .unwrap();
        let config = StrategyConfig::from_port(&adapter).unwrap();
        assert_eq!(config.leverage(), 10);
        assert!(config.trailing_only());
        assert_eq!(config.confluence_required(), 4);
    }

    #[test]
    fn from_port_converts_counts_to_usize() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nleverage = 25\nstop_loss_pct = 0.45\nposition_size_pct = 0.1\n\
             max_positions = 65536\nconfluence_required = 3\n",
        )
        .unwrap();
        let config = StrategyConfig::from_port(&adapter).unwrap();
        assert_eq!(config.max_positions(), 65_536);
        assert_eq!(config.confluence_required(), 3);

        let adapter = FileConfigAdapter::from_string(
            "[strategy]\nleverage = 25\nstop_loss_pct = 0.45\nposition_size_pct = 0.1\n\
             max_positions = 0\n",
        )
        .unwrap();
        let err = StrategyConfig::from_port(&adapter).unwrap_err();
        assert!(matches!(err, TraderError::ConfigInvalid { ref key, .. } if key == "max_positions"));
    }

    #[test]
    fn simulation_from_port_with_seed() {
        let adapter = FileConfigAdapter::from_string(
            "[simulation]\ninitial_capital = 1000\nfee_seed = 42\nmaker_rate = 0.0001\n",
        )
        .unwrap();
        let config = SimulationConfig::from_port(&adapter).unwrap();
        assert_eq!(config.initial_capital, 1000.0);
        assert_eq!(config.fee_mode, FeeMode::Seeded { seed: 42 });
        assert_eq!(config.fees.maker_rate, 0.0001);
        assert_eq!(config.max_concentration, DEFAULT_MAX_CONCENTRATION);
    }

    #[test]
    fn simulation_requires_capital() {
        let adapter = FileConfigAdapter::from_string("[simulation]\nmaker_rate = 0.1\n").unwrap();
        let err = SimulationConfig::from_port(&adapter).unwrap_err();
        assert!(matches!(err, TraderError::ConfigMissing { ref key, .. } if key == "initial_capital"));
    }
}
