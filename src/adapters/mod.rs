//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod memory_state_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_state_store;
