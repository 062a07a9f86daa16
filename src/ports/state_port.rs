//! Persistence port for live trading state.

use crate::domain::error::TraderError;
use crate::domain::leverage_cache::LeverageEntry;
use crate::domain::position::Position;

/// Stores open positions (one per symbol) and the leverage cache.
///
/// Saves replace the previous snapshot.
pub trait StateStore: Send + Sync {
    fn save_positions(&self, positions: &[Position]) -> Result<(), TraderError>;

    fn load_positions(&self) -> Result<Vec<Position>, TraderError>;

    fn save_leverage_cache(&self, entries: &[LeverageEntry]) -> Result<(), TraderError>;

    fn load_leverage_cache(&self) -> Result<Vec<LeverageEntry>, TraderError>;
}
