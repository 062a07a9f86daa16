//! Port traits (hexagonal architecture interfaces).

pub mod config_port;
pub mod data_port;
#[cfg(feature = "live")]
pub mod exchange_port;
pub mod state_port;
