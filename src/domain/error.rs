//! Domain error types.
//!
//! Only configuration problems are fatal. Market-data and scoring conditions
//! are recovered where they occur and never surface as `TraderError`.

/// Top-level error type for scalptrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("persistence error: {reason}")]
    Persistence { reason: String },

    #[error("network error: {reason}")]
    Network { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        TraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            TraderError::ConfigParse { .. }
                | TraderError::ConfigMissing { .. }
                | TraderError::ConfigInvalid { .. }
        )
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Persistence { .. } => 3,
            TraderError::Network { .. } => 4,
            TraderError::NoData { .. } | TraderError::InvalidData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Why a computed entry size could not be used.
///
/// Never fatal: the entry is skipped and the loop moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("requested size {requested} is not positive")]
    NonPositive { requested: f64 },

    #[error("no free capital: capital {capital}, allocated {allocated}")]
    NoFreeCapital { capital: f64, allocated: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn config_errors_are_flagged() {
        assert!(TraderError::missing("strategy", "leverage").is_config());
        assert!(TraderError::invalid("strategy", "leverage", "must be positive").is_config());
        assert!(!TraderError::Network {
            reason: "timeout".into()
        }
        .is_config());
    }

    #[test]
    fn display_includes_section_and_key() {
        let err = TraderError::invalid("strategy", "max_positions", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] max_positions: must be at least 1"
        );
    }

    #[test]
    fn exit_code_for_config_error() {
        let err = TraderError::missing("strategy", "leverage");
        assert_eq!(ExitCode::from(&err), ExitCode::from(2));
    }
}
