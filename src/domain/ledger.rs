//! Open positions, one per symbol.

use std::collections::BTreeMap;

use super::admission::SideCounts;
use super::position::{Position, Side};

#[derive(Debug, Clone, PartialEq)]
pub struct PositionLedger {
    positions: BTreeMap<String, Position>,
    next_id: u64,
}

impl Default for PositionLedger {
    fn default() -> Self {
        PositionLedger::new()
    }
}

impl PositionLedger {
    pub fn new() -> Self {
        PositionLedger {
            positions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Opens a position for `symbol`. Returns `None` when one is already
    /// open there.
    pub fn open(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: f64,
        entry_time: i64,
        size_usd: f64,
        leverage: f64,
    ) -> Option<Position> {
        if self.positions.contains_key(symbol) {
            return None;
        }
        let position = Position::open(
            self.next_id,
            symbol,
            side,
            entry_price,
            entry_time,
            size_usd,
            leverage,
        );
        self.next_id += 1;
        self.positions.insert(symbol.to_string(), position.clone());
        Some(position)
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.positions.keys().cloned().collect()
    }

    pub fn counts(&self) -> SideCounts {
        self.positions
            .values()
            .fold(SideCounts::default(), |counts, p| counts.with_added(p.side))
    }

    /// Margin committed to open positions.
    pub fn allocated(&self) -> f64 {
        self.positions.values().map(|p| p.size_usd).sum()
    }

    /// Replaces the position on `symbol` with its state at `price`.
    pub fn mark(&mut self, symbol: &str, price: f64, trailing_activation: f64) -> Option<&Position> {
        let position = self.positions.get_mut(symbol)?;
        *position = position.on_price(price, trailing_activation);
        Some(&*position)
    }

    /// Removes and returns the position, marked closed.
    pub fn close(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol).map(|p| p.closed())
    }

    /// Drops a position without settling it.
    pub fn discard(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }

    pub fn unrealized_pnl(&self, prices: &BTreeMap<String, f64>) -> f64 {
        self.positions
            .values()
            .filter_map(|p| prices.get(&p.symbol).map(|&price| p.unrealized_pnl(price)))
            .sum()
    }

    pub fn snapshot(&self) -> Vec<Position> {
        self.positions.values().cloned().collect()
    }

    /// Loads persisted positions. Ids continue after the largest restored one.
    pub fn restore(&mut self, positions: Vec<Position>) {
        for position in positions {
            if position.is_closed() {
                continue;
            }
            self.next_id = self.next_id.max(position.id + 1);
            self.positions.insert(position.symbol.clone(), position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::PositionState;

    #[test]
    fn open_assigns_increasing_ids() {
        let mut ledger = PositionLedger::new();
        let a = ledger.open("A", Side::Long, 10.0, 0, 5.0, 10.0).unwrap();
        let b = ledger.open("B", Side::Short, 20.0, 0, 5.0, 10.0).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn one_position_per_symbol() {
        let mut ledger = PositionLedger::new();
        assert!(ledger.open("A", Side::Long, 10.0, 0, 5.0, 10.0).is_some());
        assert!(ledger.open("A", Side::Short, 10.0, 0, 5.0, 10.0).is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn counts_and_allocation() {
        let mut ledger = PositionLedger::new();
        ledger.open("A", Side::Long, 10.0, 0, 5.0, 10.0);
        ledger.open("B", Side::Long, 10.0, 0, 3.0, 10.0);
        ledger.open("C", Side::Short, 10.0, 0, 2.0, 10.0);
        assert_eq!(ledger.counts(), SideCounts { long: 2, short: 1 });
        assert_eq!(ledger.allocated(), 10.0);
    }

    #[test]
    fn mark_updates_state() {
        let mut ledger = PositionLedger::new();
        ledger.open("A", Side::Long, 100.0, 0, 5.0, 25.0);
        let marked = ledger.mark("A", 101.0, 0.16).unwrap();
        assert_eq!(marked.state, PositionState::Trailing);
        assert!(ledger.mark("missing", 1.0, 0.16).is_none());
    }

    #[test]
    fn close_removes_and_marks_closed() {
        let mut ledger = PositionLedger::new();
        ledger.open("A", Side::Long, 100.0, 0, 5.0, 25.0);
        let closed = ledger.close("A").unwrap();
        assert!(closed.is_closed());
        assert!(ledger.is_empty());
        assert!(ledger.close("A").is_none());
    }

    #[test]
    fn unrealized_pnl_uses_known_prices() {
        let mut ledger = PositionLedger::new();
        ledger.open("A", Side::Long, 100.0, 0, 10.0, 10.0);
        ledger.open("B", Side::Short, 100.0, 0, 10.0, 10.0);
        let prices = BTreeMap::from([("A".to_string(), 101.0)]);
        assert!((ledger.unrealized_pnl(&prices) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn restore_continues_ids() {
        let mut ledger = PositionLedger::new();
        ledger.restore(vec![
            Position::open(7, "A", Side::Long, 1.0, 0, 1.0, 1.0),
            Position::open(8, "B", Side::Long, 1.0, 0, 1.0, 1.0).closed(),
        ]);
        assert_eq!(ledger.len(), 1);
        let next = ledger.open("C", Side::Short, 1.0, 0, 1.0, 1.0).unwrap();
        assert_eq!(next.id, 8);
    }
}
