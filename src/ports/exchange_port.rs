//! Exchange access port for live trading.

use crate::domain::position::Side;

/// Failure of an exchange call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// Worth retrying: timeouts, rate limits, dropped connections.
    #[error("transient exchange error: {reason}")]
    Transient { reason: String },

    /// Rejected by the exchange. Retrying gives the same answer.
    #[error("exchange rejected request with code {code}: {reason}")]
    Permanent { code: i64, reason: String },
}

impl ExchangeError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, ExchangeError::Permanent { .. })
    }
}

/// An accepted order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAck {
    pub order_id: String,
    pub fill_price: f64,
}

pub trait ExchangePort: Send + Sync {
    fn set_leverage(
        &self,
        symbol: &str,
        side: Side,
        leverage: u32,
    ) -> impl Future<Output = Result<u32, ExchangeError>> + Send;

    /// Market order opening or closing `size_usd` of margin on `symbol`.
    fn place_order(
        &self,
        symbol: &str,
        side: Side,
        size_usd: f64,
        leverage: u32,
        reduce_only: bool,
    ) -> impl Future<Output = Result<OrderAck, ExchangeError>> + Send;

    /// Closes the connection. Called once, after state has been flushed.
    fn close(&self) -> impl Future<Output = Result<(), ExchangeError>> + Send;
}
