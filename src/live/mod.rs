//! Async live trading: bounded event channel, retried exchange calls and
//! persisted session state.

pub mod retry;
pub mod session;

pub use retry::{with_retry, RetryPolicy};
pub use session::{event_channel, LiveSession, MarketEvent, SessionOptions, SessionSummary};
