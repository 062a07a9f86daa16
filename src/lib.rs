//! scalptrader: leveraged scalping engine for perpetual futures.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. The async live session sits in
//! [`live`] behind the `live` feature.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
#[cfg(feature = "live")]
pub mod live;
