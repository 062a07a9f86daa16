//! Configuration reading and field validation.
//!
//! Values are read through [`ConfigPort`] and checked before any run starts.
//! A missing required key is `ConfigMissing`; an unparsable or out-of-range
//! value is `ConfigInvalid`.

use crate::domain::error::TraderError;
use crate::domain::strategy::{SimulationConfig, StrategyConfig};
use crate::ports::config_port::ConfigPort;

/// Reads an optional float. Present but unparsable is an error.
pub(crate) fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, TraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| TraderError::invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

pub(crate) fn read_u64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<u64>, TraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
            TraderError::invalid(section, key, format!("'{raw}' is not a non-negative integer"))
        }),
    }
}

pub(crate) fn read_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<bool>, TraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(TraderError::invalid(section, key, format!("'{raw}' is not a boolean"))),
        },
    }
}

pub(crate) fn positive(section: &str, key: &str, value: f64) -> Result<f64, TraderError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TraderError::invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

pub(crate) fn non_negative(section: &str, key: &str, value: f64) -> Result<f64, TraderError> {
    if !value.is_finite() || value < 0.0 {
        return Err(TraderError::invalid(
            section,
            key,
            format!("{key} must be non-negative"),
        ));
    }
    Ok(value)
}

/// Accepts (0, 1].
pub(crate) fn fraction(section: &str, key: &str, value: f64) -> Result<f64, TraderError> {
    if !value.is_finite() || value <= 0.0 || value > 1.0 {
        return Err(TraderError::invalid(
            section,
            key,
            format!("{key} must be between 0 and 1"),
        ));
    }
    Ok(value)
}

/// Accepts [0, 1].
pub(crate) fn probability(section: &str, key: &str, value: f64) -> Result<f64, TraderError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(TraderError::invalid(
            section,
            key,
            format!("{key} must be within [0, 1]"),
        ));
    }
    Ok(value)
}

/// Builds and validates both configuration sections.
pub fn validate_config(
    config: &dyn ConfigPort,
) -> Result<(StrategyConfig, SimulationConfig), TraderError> {
    let strategy = StrategyConfig::from_port(config)?;
    let simulation = SimulationConfig::from_port(config)?;
    Ok((strategy, simulation))
}
