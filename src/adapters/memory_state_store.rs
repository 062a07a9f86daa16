//! In-memory state store for tests and dry runs.

use std::sync::Mutex;

use crate::domain::error::TraderError;
use crate::domain::leverage_cache::LeverageEntry;
use crate::domain::position::Position;
use crate::ports::state_port::StateStore;

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    positions: Mutex<Vec<Position>>,
    leverage: Mutex<Vec<LeverageEntry>>,
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> TraderError {
    TraderError::Persistence {
        reason: "state store lock poisoned".into(),
    }
}

impl StateStore for MemoryStateStore {
    fn save_positions(&self, positions: &[Position]) -> Result<(), TraderError> {
        *self.positions.lock().map_err(poisoned)? = positions.to_vec();
        Ok(())
    }

    fn load_positions(&self) -> Result<Vec<Position>, TraderError> {
        Ok(self.positions.lock().map_err(poisoned)?.clone())
    }

    fn save_leverage_cache(&self, entries: &[LeverageEntry]) -> Result<(), TraderError> {
        *self.leverage.lock().map_err(poisoned)? = entries.to_vec();
        Ok(())
    }

    fn load_leverage_cache(&self) -> Result<Vec<LeverageEntry>, TraderError> {
        Ok(self.leverage.lock().map_err(poisoned)?.clone())
    }
}
