//! Core domain types and logic.

pub mod candle;
pub mod indicator;
pub mod features;
pub mod structure;
pub mod signal;
pub mod scorer;
pub mod symbol_state;
pub mod strategy;
pub mod config_validation;
pub mod position;
pub mod admission;
pub mod ledger;
pub mod execution;
pub mod simulation;
pub mod metrics;
pub mod backtest;
pub mod registry;
pub mod leverage_cache;
pub mod error;
