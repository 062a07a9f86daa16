//! Position lifecycle and closed-trade records.
//!
//! A position moves `Open -> [Trailing] -> Closed` exactly once. Transitions
//! are values: [`Position::on_price`] and [`Position::closed`] return a new
//! position and leave the receiver untouched.

use serde::{Deserialize, Serialize};

/// Tolerance for price-threshold comparisons.
pub(crate) const EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }

    pub fn parse(value: &str) -> Option<Side> {
        match value {
            "long" => Some(Side::Long),
            "short" => Some(Side::Short),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    Open,
    Trailing,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: i64,
    pub size_usd: f64,
    pub leverage: f64,
    pub peak_price: f64,
    pub trailing_activated: bool,
    pub state: PositionState,
}

impl Position {
    pub fn open(
        id: u64,
        symbol: &str,
        side: Side,
        entry_price: f64,
        entry_time: i64,
        size_usd: f64,
        leverage: f64,
    ) -> Self {
        Position {
            id,
            symbol: symbol.to_string(),
            side,
            entry_price,
            entry_time,
            size_usd,
            leverage,
            peak_price: entry_price,
            trailing_activated: false,
            state: PositionState::Open,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == PositionState::Closed
    }

    /// Signed price move since entry, positive when in profit.
    pub fn price_change_pct(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        self.side.sign() * (price - self.entry_price) / self.entry_price
    }

    /// Price move amplified by leverage: the return on posted margin.
    pub fn return_on_capital(&self, price: f64) -> f64 {
        self.price_change_pct(price) * self.leverage
    }

    pub fn notional(&self) -> f64 {
        self.size_usd * self.leverage
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.price_change_pct(price) * self.notional()
    }

    fn is_favorable(&self, price: f64, than: f64) -> bool {
        match self.side {
            Side::Long => price > than,
            Side::Short => price < than,
        }
    }

    /// Applies a new price. Activates the trailing stop once the return on
    /// capital reaches `trailing_activation` and ratchets the peak afterwards.
    pub fn on_price(&self, price: f64, trailing_activation: f64) -> Position {
        match self.state {
            PositionState::Closed => self.clone(),
            PositionState::Open => {
                if self.return_on_capital(price) >= trailing_activation - EPS {
                    Position {
                        peak_price: price,
                        trailing_activated: true,
                        state: PositionState::Trailing,
                        ..self.clone()
                    }
                } else {
                    self.clone()
                }
            }
            PositionState::Trailing => {
                let peak_price = if self.is_favorable(price, self.peak_price) {
                    price
                } else {
                    self.peak_price
                };
                Position {
                    peak_price,
                    ..self.clone()
                }
            }
        }
    }

    /// Trailing stop level, `None` until trailing is active.
    pub fn trailing_stop(&self, callback: f64) -> Option<f64> {
        if self.state != PositionState::Trailing || self.leverage <= 0.0 {
            return None;
        }
        let offset = callback / self.leverage;
        Some(match self.side {
            Side::Long => self.peak_price * (1.0 - offset),
            Side::Short => self.peak_price * (1.0 + offset),
        })
    }

    pub fn trailing_breached(&self, price: f64, callback: f64) -> bool {
        match self.trailing_stop(callback) {
            None => false,
            Some(stop) => match self.side {
                Side::Long => price <= stop * (1.0 + EPS),
                Side::Short => price >= stop * (1.0 - EPS),
            },
        }
    }

    pub fn closed(&self) -> Position {
        Position {
            state: PositionState::Closed,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "sl")]
    StopLoss,
    #[serde(rename = "tp")]
    TakeProfit,
    #[serde(rename = "trailing_tp")]
    TrailingTp,
    #[serde(rename = "reversal")]
    Reversal,
    #[serde(rename = "end")]
    End,
    #[serde(rename = "shutdown")]
    Shutdown,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "sl",
            ExitReason::TakeProfit => "tp",
            ExitReason::TrailingTp => "trailing_tp",
            ExitReason::Reversal => "reversal",
            ExitReason::End => "end",
            ExitReason::Shutdown => "shutdown",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal record of a closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: i64,
    pub exit_price: f64,
    pub exit_time: i64,
    pub size_usd: f64,
    pub leverage: f64,
    pub gross_pnl_usd: f64,
    /// Net of fees and slippage.
    pub pnl_usd: f64,
    /// Net PnL as a fraction of the margin posted.
    pub pnl_pct: f64,
    pub fees_usd: f64,
    pub slippage_usd: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.pnl_usd > 0.0
    }

    pub fn duration_ms(&self) -> i64 {
        self.exit_time - self.entry_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn long_position() -> Position {
        Position::open(1, "BTCUSDT", Side::Long, 100.0, 0, 10.0, 25.0)
    }

    fn short_position() -> Position {
        Position::open(2, "ETHUSDT", Side::Short, 100.0, 0, 10.0, 25.0)
    }

    #[test]
    fn new_position_is_open_with_peak_at_entry() {
        let pos = long_position();
        assert_eq!(pos.state, PositionState::Open);
        assert!(!pos.trailing_activated);
        assert_eq!(pos.peak_price, 100.0);
    }

    #[test]
    fn return_on_capital_scales_with_leverage() {
        let pos = long_position();
        assert_relative_eq!(pos.return_on_capital(101.0), 0.25, epsilon = 1e-12);
        assert_relative_eq!(short_position().return_on_capital(101.0), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn unrealized_pnl_uses_notional() {
        let pos = long_position();
        // 1% of 250 notional
        assert_relative_eq!(pos.unrealized_pnl(101.0), 2.5, epsilon = 1e-12);
        assert_relative_eq!(short_position().unrealized_pnl(99.0), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn trailing_activates_at_threshold() {
        let pos = long_position();
        let below = pos.on_price(100.6, 0.16);
        assert_eq!(below.state, PositionState::Open);

        let activated = pos.on_price(100.64, 0.16);
        assert_eq!(activated.state, PositionState::Trailing);
        assert!(activated.trailing_activated);
        assert_eq!(activated.peak_price, 100.64);
        // receiver untouched
        assert_eq!(pos.state, PositionState::Open);
    }

    #[test]
    fn peak_only_moves_favorably_for_long() {
        let pos = long_position().on_price(101.0, 0.16);
        let higher = pos.on_price(102.0, 0.16);
        assert_eq!(higher.peak_price, 102.0);
        let lower = higher.on_price(101.5, 0.16);
        assert_eq!(lower.peak_price, 102.0);
    }

    #[test]
    fn peak_only_moves_favorably_for_short() {
        let pos = short_position().on_price(99.0, 0.16);
        assert_eq!(pos.state, PositionState::Trailing);
        let lower = pos.on_price(98.0, 0.16);
        assert_eq!(lower.peak_price, 98.0);
        assert_eq!(lower.on_price(98.5, 0.16).peak_price, 98.0);
    }

    #[test]
    fn trailing_stop_level() {
        let pos = long_position().on_price(102.0, 0.16);
        // callback 0.05 / leverage 25 = 0.2% below the peak
        assert_relative_eq!(pos.trailing_stop(0.05).unwrap(), 102.0 * 0.998, epsilon = 1e-9);
        assert!(pos.trailing_breached(101.796, 0.05));
        assert!(!pos.trailing_breached(101.9, 0.05));

        let short = short_position().on_price(98.0, 0.16);
        assert_relative_eq!(short.trailing_stop(0.05).unwrap(), 98.0 * 1.002, epsilon = 1e-9);
        assert!(short.trailing_breached(98.2, 0.05));
    }

    #[test]
    fn no_trailing_stop_while_open() {
        assert!(long_position().trailing_stop(0.05).is_none());
        assert!(!long_position().trailing_breached(0.0, 0.05));
    }

    #[test]
    fn closed_position_ignores_prices() {
        let closed = long_position().closed();
        assert!(closed.is_closed());
        assert_eq!(closed.on_price(200.0, 0.16), closed);
    }

    #[test]
    fn exit_reason_serializes_short_names() {
        assert_eq!(serde_json::to_string(&ExitReason::StopLoss).unwrap(), "\"sl\"");
        assert_eq!(ExitReason::TrailingTp.to_string(), "trailing_tp");
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::Long.opposite(), Side::Short);
        assert_eq!(Side::parse("short"), Some(Side::Short));
        assert_eq!(Side::parse("sideways"), None);
    }
}
