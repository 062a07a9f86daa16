//! Rolling per-symbol market state.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::candle::Candle;
use super::execution::FillContext;
use super::indicator::mean;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Top-of-book quote with resting volumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub bid: f64,
    pub ask: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
}

impl BookSnapshot {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }

    pub fn spread_bps(&self) -> f64 {
        let mid = self.mid();
        if mid <= 0.0 {
            return f64::INFINITY;
        }
        (self.ask - self.bid) / mid * 10_000.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolState {
    symbol: String,
    capacity: usize,
    window: Vec<Candle>,
    /// (timestamp, quote volume) of every candle in the last day, kept apart
    /// from the bounded window.
    day_volume: VecDeque<(i64, f64)>,
    book: Option<BookSnapshot>,
    funding_rate: f64,
    trade_count: u32,
    total_reward: f64,
}

impl SymbolState {
    pub fn new(symbol: &str, capacity: usize) -> Self {
        SymbolState {
            symbol: symbol.to_string(),
            capacity: capacity.max(1),
            window: Vec::with_capacity(capacity),
            day_volume: VecDeque::new(),
            book: None,
            funding_rate: 0.0,
            trade_count: 0,
            total_reward: 0.0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Appends a candle. A candle with the last timestamp replaces the last
    /// entry; an older one is ignored. Returns whether the window changed.
    pub fn push(&mut self, candle: Candle) -> bool {
        match self.window.last() {
            Some(last) if candle.timestamp_ms < last.timestamp_ms => return false,
            Some(last) if candle.timestamp_ms == last.timestamp_ms => {
                self.window.pop();
                self.day_volume.pop_back();
            }
            _ => {}
        }
        let cutoff = candle.timestamp_ms - DAY_MS;
        self.day_volume.push_back((candle.timestamp_ms, candle.quote_volume()));
        while self.day_volume.front().is_some_and(|&(ts, _)| ts <= cutoff) {
            self.day_volume.pop_front();
        }
        self.window.push(candle);
        if self.window.len() > self.capacity {
            let excess = self.window.len() - self.capacity;
            self.window.drain(..excess);
        }
        true
    }

    pub fn window(&self) -> &[Candle] {
        &self.window
    }

    pub fn last(&self) -> Option<&Candle> {
        self.window.last()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.window.last().map(|c| c.close)
    }

    pub fn book(&self) -> Option<&BookSnapshot> {
        self.book.as_ref()
    }

    pub fn set_book(&mut self, book: Option<BookSnapshot>) {
        self.book = book;
    }

    pub fn funding_rate(&self) -> f64 {
        self.funding_rate
    }

    pub fn set_funding_rate(&mut self, rate: f64) {
        self.funding_rate = rate;
    }

    pub fn trade_count(&self) -> u32 {
        self.trade_count
    }

    pub fn mean_reward(&self) -> f64 {
        if self.trade_count == 0 {
            return 0.0;
        }
        self.total_reward / f64::from(self.trade_count)
    }

    /// Feeds a closed trade's return back into the exploration statistics.
    pub fn record_trade(&mut self, pnl_pct: f64) {
        self.trade_count += 1;
        self.total_reward += pnl_pct;
    }

    /// Latest volume over the mean of the `lookback` candles before it.
    pub fn volume_ratio(&self, lookback: usize) -> f64 {
        let Some((last, prior)) = self.window.split_last() else {
            return 0.0;
        };
        let start = prior.len().saturating_sub(lookback);
        let volumes: Vec<f64> = prior[start..].iter().map(|c| c.volume).collect();
        let average = mean(&volumes);
        if average <= 0.0 {
            return 0.0;
        }
        last.volume / average
    }

    /// Quote value traded over the last `lookback` candles.
    pub fn recent_traded_value(&self, lookback: usize) -> f64 {
        let start = self.window.len().saturating_sub(lookback);
        self.window[start..].iter().map(Candle::quote_volume).sum()
    }

    /// Quote value traded within 24 hours of the latest candle.
    pub fn quote_volume_24h(&self) -> f64 {
        self.day_volume.iter().map(|&(_, value)| value).sum()
    }

    pub fn fill_context(&self, lookback: usize) -> FillContext {
        FillContext {
            recent_traded_value: self.recent_traded_value(lookback),
            volume_ratio: self.volume_ratio(lookback),
        }
    }
}
