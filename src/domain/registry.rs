//! Per-symbol state and leverage cache for one session.
//!
//! Created by [`Registry::init`] from a state store and handed back to the
//! store by [`Registry::flush_and_close`].

use std::collections::BTreeMap;

use tracing::info;

use super::error::TraderError;
use super::leverage_cache::{LeverageCache, FRESHNESS_MS};
use super::position::Position;
use super::symbol_state::SymbolState;
use crate::ports::state_port::StateStore;

pub const DEFAULT_WINDOW_CAPACITY: usize = 500;

#[derive(Debug, Clone)]
pub struct Registry {
    states: BTreeMap<String, SymbolState>,
    leverage: LeverageCache,
    window_capacity: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl Registry {
    pub fn new(window_capacity: usize) -> Self {
        Registry {
            states: BTreeMap::new(),
            leverage: LeverageCache::default(),
            window_capacity,
        }
    }

    /// Loads the leverage cache and any open positions left by a previous
    /// session.
    pub fn init(
        store: &dyn StateStore,
        window_capacity: usize,
    ) -> Result<(Registry, Vec<Position>), TraderError> {
        let entries = store.load_leverage_cache()?;
        let positions = store.load_positions()?;
        info!(
            leverage_entries = entries.len(),
            positions = positions.len(),
            "registry restored"
        );
        let registry = Registry {
            states: BTreeMap::new(),
            leverage: LeverageCache::from_entries(entries, FRESHNESS_MS),
            window_capacity,
        };
        Ok((registry, positions))
    }

    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    pub fn state(&self, symbol: &str) -> Option<&SymbolState> {
        self.states.get(symbol)
    }

    pub fn state_mut(&mut self, symbol: &str) -> &mut SymbolState {
        let capacity = self.window_capacity;
        self.states
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolState::new(symbol, capacity))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.states.get(symbol).and_then(SymbolState::last_price)
    }

    pub fn leverage_cache(&self) -> &LeverageCache {
        &self.leverage
    }

    pub fn leverage_cache_mut(&mut self) -> &mut LeverageCache {
        &mut self.leverage
    }

    /// Writes positions and the leverage cache to the store.
    pub fn flush(&self, positions: &[Position], store: &dyn StateStore) -> Result<(), TraderError> {
        store.save_positions(positions)?;
        store.save_leverage_cache(&self.leverage.entries())?;
        Ok(())
    }

    pub fn flush_and_close(
        self,
        positions: &[Position],
        store: &dyn StateStore,
    ) -> Result<(), TraderError> {
        self.flush(positions, store)?;
        info!(
            symbols = self.states.len(),
            positions = positions.len(),
            "registry flushed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_state_store::MemoryStateStore;
    use crate::domain::leverage_cache::LeverageLookup;
    use crate::domain::position::Side;

    #[test]
    fn state_is_created_on_demand() {
        let mut registry = Registry::new(10);
        assert!(registry.state("A").is_none());
        registry.state_mut("A");
        assert!(registry.state("A").is_some());
        assert_eq!(registry.symbols().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn flush_then_init_restores() {
        let store = MemoryStateStore::default();
        let mut registry = Registry::new(10);
        registry
            .leverage_cache_mut()
            .record_success("A", Side::Long, 20, 0);
        let positions = vec![Position::open(3, "A", Side::Long, 10.0, 0, 1.0, 20.0)];
        registry.flush_and_close(&positions, &store).unwrap();

        let (restored, loaded) = Registry::init(&store, 10).unwrap();
        assert_eq!(loaded, positions);
        assert_eq!(
            restored.leverage_cache().lookup("A", Side::Long, 1),
            LeverageLookup::Fresh(20)
        );
    }
}
