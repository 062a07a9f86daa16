//! Performance metrics derived from closed trades and the equity curve.

use serde::Serialize;

use super::position::Trade;
use super::simulation::EquityPoint;

const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_pnl: f64,
    pub total_roi: f64,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    /// Gross profit over gross loss; infinite with profits and no losses.
    pub profit_factor: f64,
    pub total_fees: f64,
    pub total_slippage: f64,
    pub elapsed_days: f64,
    pub trades_per_day: f64,
    pub trades_per_hour: f64,
    /// Largest peak-to-trough equity decline, as a fraction of the peak.
    pub max_drawdown: f64,
    pub max_drawdown_duration_ms: i64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub longest_win_streak: usize,
    pub longest_loss_streak: usize,
    pub roi_per_day: f64,
    pub roi_per_week: f64,
    pub roi_per_month: f64,
}

impl PerformanceMetrics {
    pub fn compute(initial_capital: f64, trades: &[Trade], equity_curve: &[EquityPoint]) -> Self {
        let total_pnl: f64 = trades.iter().map(|t| t.pnl_usd).sum();
        let final_capital = initial_capital + total_pnl;
        let total_roi = if initial_capital > 0.0 {
            total_pnl / initial_capital
        } else {
            0.0
        };

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl_usd;
            if pnl > 0.0 {
                wins += 1;
                gross_profit += pnl;
            } else if pnl < 0.0 {
                losses += 1;
                gross_loss += pnl.abs();
            }
        }

        // 0 for an empty run, otherwise an actual trade's PnL
        let (best_trade, worst_trade) = match trades.first() {
            None => (0.0, 0.0),
            Some(first) => trades.iter().map(|t| t.pnl_usd).fold(
                (first.pnl_usd, first.pnl_usd),
                |(best, worst), pnl| (best.max(pnl), worst.min(pnl)),
            ),
        };

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if wins > 0 {
            gross_profit / wins as f64
        } else {
            0.0
        };
        let avg_loss = if losses > 0 {
            gross_loss / losses as f64
        } else {
            0.0
        };

        let elapsed_days = elapsed_ms(trades, equity_curve) as f64 / MS_PER_DAY;
        let (trades_per_day, trades_per_hour) = if elapsed_days > 0.0 {
            let per_day = total_trades as f64 / elapsed_days;
            (per_day, per_day / 24.0)
        } else {
            (0.0, 0.0)
        };

        let (max_drawdown, max_drawdown_duration_ms) = compute_drawdown(equity_curve);

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_pct).collect();
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&returns);

        let calmar_ratio = if max_drawdown > 0.0 {
            total_roi / max_drawdown
        } else {
            0.0
        };

        let (longest_win_streak, longest_loss_streak) = compute_streaks(trades);

        let roi_per_day = if elapsed_days > 0.0 {
            total_roi / elapsed_days
        } else {
            0.0
        };

        PerformanceMetrics {
            initial_capital,
            final_capital,
            total_pnl,
            total_roi,
            total_trades,
            wins,
            losses,
            win_rate,
            avg_win,
            avg_loss,
            best_trade,
            worst_trade,
            profit_factor,
            total_fees: trades.iter().map(|t| t.fees_usd).sum(),
            total_slippage: trades.iter().map(|t| t.slippage_usd).sum(),
            elapsed_days,
            trades_per_day,
            trades_per_hour,
            max_drawdown,
            max_drawdown_duration_ms,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            longest_win_streak,
            longest_loss_streak,
            roi_per_day,
            roi_per_week: roi_per_day * 7.0,
            roi_per_month: roi_per_day * 30.0,
        }
    }
}

/// Span of the run: the equity curve if it has two points, else the trades.
fn elapsed_ms(trades: &[Trade], equity_curve: &[EquityPoint]) -> i64 {
    if let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) {
        if last.timestamp_ms > first.timestamp_ms {
            return last.timestamp_ms - first.timestamp_ms;
        }
    }
    let start = trades.iter().map(|t| t.entry_time).min();
    let end = trades.iter().map(|t| t.exit_time).max();
    match (start, end) {
        (Some(s), Some(e)) if e > s => e - s,
        _ => 0,
    }
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut peak_time = first.timestamp_ms;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0i64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            peak_time = point.timestamp_ms;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
            max_duration = max_duration.max(point.timestamp_ms - peak_time);
        }
    }

    (max_dd, max_duration)
}

/// Sharpe and Sortino over per-trade returns. Both are 0 with fewer than
/// two trades or no dispersion.
fn compute_risk_adjusted(returns: &[f64]) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    let sharpe = if stddev > 0.0 { mean / stddev } else { 0.0 };

    let downside = (returns.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / n).sqrt();
    let sortino = if downside > 0.0 { mean / downside } else { 0.0 };

    (sharpe, sortino)
}

fn compute_streaks(trades: &[Trade]) -> (usize, usize) {
    let mut longest_win = 0;
    let mut longest_loss = 0;
    let mut win_run = 0;
    let mut loss_run = 0;

    for trade in trades {
        if trade.pnl_usd > 0.0 {
            win_run += 1;
            loss_run = 0;
        } else if trade.pnl_usd < 0.0 {
            loss_run += 1;
            win_run = 0;
        } else {
            win_run = 0;
            loss_run = 0;
        }
        longest_win = longest_win.max(win_run);
        longest_loss = longest_loss.max(loss_run);
    }

    (longest_win, longest_loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, Side};
    use approx::assert_relative_eq;

    const HOUR_MS: i64 = 3_600_000;

    fn make_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp_ms: i as i64 * HOUR_MS,
                equity,
            })
            .collect()
    }

    fn make_trade(pnl_usd: f64, entry_hour: i64) -> Trade {
        Trade {
            id: entry_hour as u64,
            symbol: "BTCUSDT".into(),
            side: Side::Long,
            entry_price: 100.0,
            entry_time: entry_hour * HOUR_MS,
            exit_price: 100.0,
            exit_time: (entry_hour + 1) * HOUR_MS,
            size_usd: 10.0,
            leverage: 10.0,
            gross_pnl_usd: pnl_usd,
            pnl_usd,
            pnl_pct: pnl_usd / 10.0,
            fees_usd: 0.1,
            slippage_usd: 0.05,
            exit_reason: ExitReason::TakeProfit,
        }
    }

    #[test]
    fn metrics_without_trades() {
        let metrics = PerformanceMetrics::compute(100.0, &[], &[]);
        assert_eq!(metrics.total_trades, 0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.final_capital, 100.0);
        assert_eq!(metrics.trades_per_day, 0.0);
    }

    #[test]
    fn all_losing_run_has_negative_best_trade() {
        let trades = vec![make_trade(-1.0, 0), make_trade(-3.0, 1)];
        let metrics = PerformanceMetrics::compute(50.0, &trades, &[]);
        assert_relative_eq!(metrics.best_trade, -1.0);
        assert_relative_eq!(metrics.worst_trade, -3.0);
    }

    #[test]
    fn all_winning_run_has_positive_worst_trade() {
        let trades = vec![make_trade(1.0, 0), make_trade(3.0, 1)];
        let metrics = PerformanceMetrics::compute(50.0, &trades, &[]);
        assert_relative_eq!(metrics.best_trade, 3.0);
        assert_relative_eq!(metrics.worst_trade, 1.0);
    }

    #[test]
    fn win_rate_and_averages() {
        let trades = vec![make_trade(2.0, 0), make_trade(-1.0, 1), make_trade(4.0, 2)];
        let metrics = PerformanceMetrics::compute(100.0, &trades, &[]);
        assert_eq!(metrics.wins, 2);
        assert_eq!(metrics.losses, 1);
        assert_relative_eq!(metrics.win_rate, 2.0 / 3.0);
        assert_relative_eq!(metrics.avg_win, 3.0);
        assert_relative_eq!(metrics.avg_loss, 1.0);
        assert_relative_eq!(metrics.best_trade, 4.0);
        assert_relative_eq!(metrics.worst_trade, -1.0);
        assert_relative_eq!(metrics.profit_factor, 6.0);
        assert_relative_eq!(metrics.total_roi, 0.05);
        assert_relative_eq!(metrics.total_fees, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn profit_factor_infinite_without_losses() {
        let metrics = PerformanceMetrics::compute(100.0, &[make_trade(1.0, 0)], &[]);
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn sharpe_uses_sample_deviation() {
        let trades = vec![make_trade(1.0, 0), make_trade(3.0, 1)];
        let metrics = PerformanceMetrics::compute(100.0, &trades, &[]);
        // pnl_pct 0.1 and 0.3: mean 0.2, sample std 0.1414
        assert_relative_eq!(metrics.sharpe_ratio, 0.2 / 0.02_f64.sqrt(), epsilon = 1e-9);
        assert_eq!(metrics.sortino_ratio, 0.0);
    }

    #[test]
    fn sharpe_zero_for_identical_returns() {
        let trades = vec![make_trade(1.0, 0), make_trade(1.0, 1)];
        assert_eq!(PerformanceMetrics::compute(100.0, &trades, &[]).sharpe_ratio, 0.0);
    }

    #[test]
    fn drawdown_depth_and_duration() {
        let curve = make_curve(&[100.0, 120.0, 90.0, 100.0, 130.0, 125.0]);
        let (dd, duration) = compute_drawdown(&curve);
        assert_relative_eq!(dd, 0.25);
        assert_eq!(duration, 2 * HOUR_MS);
    }

    #[test]
    fn calmar_and_roi_scaling() {
        let values: Vec<f64> = (0..=24).map(|i| if i == 12 { 90.0 } else { 100.0 }).collect();
        let curve = make_curve(&values);
        let trades = vec![make_trade(10.0, 0)];
        let metrics = PerformanceMetrics::compute(100.0, &trades, &curve);
        assert_relative_eq!(metrics.elapsed_days, 1.0);
        assert_relative_eq!(metrics.roi_per_day, 0.1, epsilon = 1e-12);
        assert_relative_eq!(metrics.roi_per_week, 0.7, epsilon = 1e-12);
        assert_relative_eq!(metrics.roi_per_month, 3.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.calmar_ratio, 1.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.trades_per_day, 1.0);
        assert_relative_eq!(metrics.trades_per_hour, 1.0 / 24.0);
    }

    #[test]
    fn streaks() {
        let pnls = [1.0, 2.0, -1.0, -1.0, -1.0, 3.0];
        let trades: Vec<Trade> = pnls
            .iter()
            .enumerate()
            .map(|(i, &p)| make_trade(p, i as i64))
            .collect();
        assert_eq!(compute_streaks(&trades), (2, 3));
    }
}
