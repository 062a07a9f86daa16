//! Candle source port trait.

use crate::domain::candle::Candle;
use crate::domain::error::TraderError;

pub trait CandleSource {
    /// Candles for `symbol` with `start_ms <= timestamp_ms <= end_ms`,
    /// oldest first.
    fn fetch_candles(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, TraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, TraderError>;
}
