//! Order-flow imbalance.
//!
//! Without book data each candle's volume is signed by its direction: close
//! above open is buying, below is selling. A doji is signed by close versus
//! the previous close and split evenly when that is also unchanged.
//! Imbalance = (up - down) / (up + down), in [-1, 1].

use crate::domain::candle::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderFlowReading {
    pub up_volume: f64,
    pub down_volume: f64,
    pub imbalance: f64,
}

impl OrderFlowReading {
    fn from_volumes(up_volume: f64, down_volume: f64) -> Self {
        let total = up_volume + down_volume;
        let imbalance = if total > 0.0 {
            (up_volume - down_volume) / total
        } else {
            0.0
        };
        OrderFlowReading {
            up_volume,
            down_volume,
            imbalance,
        }
    }
}

pub fn compute_order_flow(window: &[Candle]) -> OrderFlowReading {
    let mut up = 0.0;
    let mut down = 0.0;
    let mut prev_close: Option<f64> = None;

    for candle in window {
        let reference = if candle.close != candle.open {
            Some(candle.open)
        } else {
            prev_close.filter(|&p| p != candle.close)
        };
        match reference {
            Some(r) if candle.close > r => up += candle.volume,
            Some(_) => down += candle.volume,
            None => {
                up += candle.volume / 2.0;
                down += candle.volume / 2.0;
            }
        }
        prev_close = Some(candle.close);
    }

    OrderFlowReading::from_volumes(up, down)
}

/// Imbalance from resting bid and ask volume at the top of the book.
pub fn order_flow_from_book(bid_volume: f64, ask_volume: f64) -> OrderFlowReading {
    OrderFlowReading::from_volumes(bid_volume.max(0.0), ask_volume.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::tests_support::candle;

    #[test]
    fn empty_window_is_balanced() {
        assert_eq!(compute_order_flow(&[]), OrderFlowReading::default());
    }

    #[test]
    fn signs_by_candle_body() {
        let window = vec![
            candle(0, 10.0, 11.0, 9.0, 11.0, 3.0),
            candle(1, 11.0, 11.0, 9.0, 10.0, 1.0),
        ];
        let reading = compute_order_flow(&window);
        assert_eq!(reading.up_volume, 3.0);
        assert_eq!(reading.down_volume, 1.0);
        assert!((reading.imbalance - 0.5).abs() < 1e-12);
    }

    #[test]
    fn doji_uses_previous_close() {
        let window = vec![
            candle(0, 10.0, 10.0, 10.0, 10.0, 2.0),
            candle(1, 11.0, 11.0, 11.0, 11.0, 4.0),
        ];
        let reading = compute_order_flow(&window);
        // first candle split 1/1, second is up against the previous close
        assert_eq!(reading.up_volume, 5.0);
        assert_eq!(reading.down_volume, 1.0);
    }

    #[test]
    fn unchanged_doji_splits() {
        let window = vec![
            candle(0, 10.0, 10.0, 10.0, 10.0, 2.0),
            candle(1, 10.0, 10.0, 10.0, 10.0, 2.0),
        ];
        assert_eq!(compute_order_flow(&window).imbalance, 0.0);
    }

    #[test]
    fn book_imbalance() {
        let reading = order_flow_from_book(30.0, 10.0);
        assert!((reading.imbalance - 0.5).abs() < 1e-12);
        assert_eq!(order_flow_from_book(0.0, 0.0).imbalance, 0.0);
    }
}
