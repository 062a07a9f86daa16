//! Leverage settings already applied on the exchange, per symbol and side.
//!
//! Successful results stay fresh for 24 hours. Permanent failures (the
//! exchange refusing the leverage outright) never expire, so the symbol is
//! not retried every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::position::Side;

pub const FRESHNESS_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageEntry {
    pub symbol: String,
    pub side: Side,
    pub leverage: u32,
    pub timestamp_ms: i64,
    pub failed: bool,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverageLookup {
    Fresh(u32),
    PermanentlyFailed { code: Option<i64> },
    Miss,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeverageCache {
    entries: BTreeMap<(String, Side), LeverageEntry>,
    freshness_ms: i64,
}

impl Default for LeverageCache {
    fn default() -> Self {
        LeverageCache::new(FRESHNESS_MS)
    }
}

impl LeverageCache {
    pub fn new(freshness_ms: i64) -> Self {
        LeverageCache {
            entries: BTreeMap::new(),
            freshness_ms,
        }
    }

    pub fn from_entries(entries: Vec<LeverageEntry>, freshness_ms: i64) -> Self {
        let mut cache = LeverageCache::new(freshness_ms);
        for entry in entries {
            cache
                .entries
                .insert((entry.symbol.clone(), entry.side), entry);
        }
        cache
    }

    pub fn lookup(&self, symbol: &str, side: Side, now_ms: i64) -> LeverageLookup {
        match self.entries.get(&(symbol.to_string(), side)) {
            None => LeverageLookup::Miss,
            Some(entry) if entry.failed => LeverageLookup::PermanentlyFailed {
                code: entry.error_code,
            },
            Some(entry) if now_ms - entry.timestamp_ms < self.freshness_ms => {
                LeverageLookup::Fresh(entry.leverage)
            }
            Some(_) => LeverageLookup::Miss,
        }
    }

    pub fn record_success(&mut self, symbol: &str, side: Side, leverage: u32, now_ms: i64) {
        self.entries.insert(
            (symbol.to_string(), side),
            LeverageEntry {
                symbol: symbol.to_string(),
                side,
                leverage,
                timestamp_ms: now_ms,
                failed: false,
                error_code: None,
            },
        );
    }

    pub fn record_permanent_failure(
        &mut self,
        symbol: &str,
        side: Side,
        leverage: u32,
        code: Option<i64>,
        now_ms: i64,
    ) {
        self.entries.insert(
            (symbol.to_string(), side),
            LeverageEntry {
                symbol: symbol.to_string(),
                side,
                leverage,
                timestamp_ms: now_ms,
                failed: true,
                error_code: code,
            },
        );
    }

    pub fn entries(&self) -> Vec<LeverageEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
