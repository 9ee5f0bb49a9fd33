//! Performance metrics and trade statistics.
//!
//! All figures are kept at full precision; rounding is left to whoever
//! displays them.

use chrono::{Datelike, NaiveDate};

use super::equity::EquityPoint;
use super::indicator_helpers::TRADING_DAYS_PER_YEAR;
use super::trade::Trade;

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Percent.
    pub total_return: f64,
    /// Percent, arithmetic mean of daily returns times 252.
    pub annual_return: f64,
    /// Percent, annualized sample deviation.
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Percent, zero or negative.
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    pub sortino_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeStats {
    pub total_trades: usize,
    /// Percent.
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub avg_hold_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    /// Percent below the running peak.
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    /// Percent change of month-end equity versus the previous month-end.
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub metrics: PerformanceMetrics,
    pub trade_stats: TradeStats,
    pub drawdowns: Vec<DrawdownPoint>,
    pub monthly_returns: Vec<MonthlyReturn>,
}

impl PerformanceReport {
    /// Flat `(label, value)` pairs in display order.
    pub fn summary_rows(&self) -> Vec<(&'static str, f64)> {
        let m = &self.metrics;
        let t = &self.trade_stats;
        vec![
            ("total_return_pct", m.total_return),
            ("annual_return_pct", m.annual_return),
            ("volatility_pct", m.volatility),
            ("sharpe_ratio", m.sharpe_ratio),
            ("max_drawdown_pct", m.max_drawdown),
            ("calmar_ratio", m.calmar_ratio),
            ("sortino_ratio", m.sortino_ratio),
            ("total_trades", t.total_trades as f64),
            ("win_rate_pct", t.win_rate),
            ("avg_win", t.avg_win),
            ("avg_loss", t.avg_loss),
            ("profit_factor", t.profit_factor),
            ("avg_hold_time_days", t.avg_hold_time),
        ]
    }
}

pub fn analyze_performance(equity_curve: &[EquityPoint], trades: &[Trade]) -> PerformanceReport {
    PerformanceReport {
        metrics: PerformanceMetrics::compute(equity_curve),
        trade_stats: TradeStats::compute(trades),
        drawdowns: drawdown_series(equity_curve),
        monthly_returns: monthly_returns(equity_curve),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Period returns of the curve; pairs with a zero previous value are dropped.
pub fn equity_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0].equity != 0.0)
        .map(|w| w[1].equity / w[0].equity - 1.0)
        .collect()
}

impl PerformanceMetrics {
    pub fn compute(equity_curve: &[EquityPoint]) -> Self {
        let returns = equity_returns(equity_curve);

        let total_return = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) if first.equity != 0.0 => {
                (last.equity / first.equity - 1.0) * 100.0
            }
            _ => 0.0,
        };

        let annual_return = if returns.is_empty() {
            0.0
        } else {
            mean(&returns) * TRADING_DAYS_PER_YEAR * 100.0
        };

        let volatility = if returns.len() < 2 {
            0.0
        } else {
            let mu = mean(&returns);
            let variance = returns.iter().map(|r| (r - mu).powi(2)).sum::<f64>()
                / (returns.len() - 1) as f64;
            variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
        };

        let sharpe_ratio = if volatility != 0.0 {
            annual_return / volatility
        } else {
            0.0
        };

        let max_drawdown = drawdown_series(equity_curve)
            .iter()
            .map(|p| p.drawdown)
            .fold(0.0_f64, f64::min);

        let calmar_ratio = if max_drawdown != 0.0 {
            (annual_return / max_drawdown).abs()
        } else {
            0.0
        };

        PerformanceMetrics {
            total_return,
            annual_return,
            volatility,
            sharpe_ratio,
            max_drawdown,
            calmar_ratio,
            sortino_ratio: sortino_ratio(&returns),
        }
    }
}

/// Annualized mean return over the annualized root-mean-square of the
/// negative returns. +inf when nothing was lost, 0 with no returns at all.
pub fn sortino_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if downside.is_empty() {
        return f64::INFINITY;
    }
    let rms = (downside.iter().map(|r| r * r).sum::<f64>() / downside.len() as f64).sqrt();
    mean(returns) * TRADING_DAYS_PER_YEAR / (TRADING_DAYS_PER_YEAR.sqrt() * rms)
}

impl TradeStats {
    pub fn compute(trades: &[Trade]) -> Self {
        if trades.is_empty() {
            return TradeStats {
                total_trades: 0,
                win_rate: 0.0,
                avg_win: 0.0,
                avg_loss: 0.0,
                profit_factor: 0.0,
                avg_hold_time: 0.0,
            };
        }

        let wins: Vec<f64> = trades
            .iter()
            .map(|t| t.realized_pnl)
            .filter(|&p| p > 0.0)
            .collect();
        let losses: Vec<f64> = trades
            .iter()
            .map(|t| t.realized_pnl)
            .filter(|&p| p < 0.0)
            .collect();

        let total_wins: f64 = wins.iter().sum();
        let total_losses: f64 = losses.iter().sum();

        let profit_factor = if losses.is_empty() || total_losses == 0.0 {
            f64::INFINITY
        } else {
            (total_wins / total_losses).abs()
        };

        let hold_days: Vec<f64> = trades.iter().map(|t| t.hold_time_days as f64).collect();

        TradeStats {
            total_trades: trades.len(),
            win_rate: wins.len() as f64 / trades.len() as f64 * 100.0,
            avg_win: if wins.is_empty() { 0.0 } else { mean(&wins) },
            avg_loss: if losses.is_empty() { 0.0 } else { mean(&losses) },
            profit_factor,
            avg_hold_time: mean(&hold_days),
        }
    }
}

/// Percent distance below the running peak, per bar.
pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|point| {
            peak = peak.max(point.equity);
            let drawdown = if peak > 0.0 {
                (point.equity / peak - 1.0) * 100.0
            } else {
                0.0
            };
            DrawdownPoint {
                date: point.date,
                drawdown,
            }
        })
        .collect()
}

fn follows(prev: (i32, u32), next: (i32, u32)) -> bool {
    match prev {
        (year, 12) => next == (year + 1, 1),
        (year, month) => next == (year, month + 1),
    }
}

/// Month-end to month-end equity change. The first month has no
/// predecessor and is omitted, as is any month following a month without
/// bars.
pub fn monthly_returns(equity_curve: &[EquityPoint]) -> Vec<MonthlyReturn> {
    let mut month_ends: Vec<(i32, u32, f64)> = Vec::new();
    for point in equity_curve {
        let key = (point.date.year(), point.date.month());
        match month_ends.last_mut() {
            Some(last) if (last.0, last.1) == key => last.2 = point.equity,
            _ => month_ends.push((key.0, key.1, point.equity)),
        }
    }

    month_ends
        .windows(2)
        .filter(|w| w[0].2 != 0.0 && follows((w[0].0, w[0].1), (w[1].0, w[1].1)))
        .map(|w| MonthlyReturn {
            year: w[1].0,
            month: w[1].1,
            return_pct: (w[1].2 / w[0].2 - 1.0) * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::Direction;
    use approx::assert_relative_eq;

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                equity: v,
            })
            .collect()
    }

    fn make_trade(pnl: f64, hold: i64) -> Trade {
        Trade {
            date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            fill_price: 100.0,
            size: -1.0,
            direction: Direction::Sell,
            resulting_position: 0.0,
            realized_pnl: pnl,
            hold_time_days: hold,
        }
    }

    #[test]
    fn flat_equity_metrics() {
        let m = PerformanceMetrics::compute(&make_equity_curve(&[1.0; 5]));
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.annual_return, 0.0);
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
        assert_eq!(m.calmar_ratio, 0.0);
        assert_eq!(m.sortino_ratio, f64::INFINITY);
    }

    #[test]
    fn total_and_annual_return() {
        let m = PerformanceMetrics::compute(&make_equity_curve(&[1.0, 1.01, 1.0201]));
        assert_relative_eq!(m.total_return, 2.01, epsilon = 1e-9);
        assert_relative_eq!(m.annual_return, 0.01 * 252.0 * 100.0, epsilon = 1e-9);
        // identical returns have zero deviation
        assert!(m.volatility.abs() < 1e-9);
    }

    #[test]
    fn sharpe_uses_sample_deviation() {
        let m = PerformanceMetrics::compute(&make_equity_curve(&[1.0, 1.1, 0.99]));
        let returns: [f64; 2] = [0.1, 0.99 / 1.1 - 1.0];
        let mu = (returns[0] + returns[1]) / 2.0;
        let sd = ((returns[0] - mu).powi(2) + (returns[1] - mu).powi(2)).sqrt();
        let vol = sd * 252.0_f64.sqrt() * 100.0;
        assert_relative_eq!(m.volatility, vol, epsilon = 1e-9);
        assert_relative_eq!(m.sharpe_ratio, m.annual_return / vol, epsilon = 1e-9);
    }

    #[test]
    fn single_return_has_zero_volatility() {
        let m = PerformanceMetrics::compute(&make_equity_curve(&[1.0, 1.05]));
        assert_eq!(m.volatility, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn single_point_curve() {
        let m = PerformanceMetrics::compute(&make_equity_curve(&[1.0]));
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.sortino_ratio, 0.0);
    }

    #[test]
    fn max_drawdown_and_calmar() {
        let m = PerformanceMetrics::compute(&make_equity_curve(&[1.0, 1.2, 0.9, 1.0]));
        assert_relative_eq!(m.max_drawdown, -25.0, epsilon = 1e-9);
        assert_relative_eq!(m.calmar_ratio, (m.annual_return / -25.0).abs(), epsilon = 1e-9);
    }

    #[test]
    fn sortino_uses_negative_returns_only() {
        let returns = [0.02, -0.01, 0.03, -0.02];
        let mean = 0.02 / 4.0;
        let dd = 252.0_f64.sqrt() * ((0.0001 + 0.0004) / 2.0_f64).sqrt();
        assert_relative_eq!(sortino_ratio(&returns), mean * 252.0 / dd, epsilon = 1e-9);
        assert_eq!(sortino_ratio(&[0.01, 0.0]), f64::INFINITY);
        assert_eq!(sortino_ratio(&[]), 0.0);
    }

    #[test]
    fn no_trades_stats_are_zero() {
        let stats = TradeStats::compute(&[]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.profit_factor, 0.0);
        assert_eq!(stats.avg_hold_time, 0.0);
    }

    #[test]
    fn trade_stats_mixed() {
        let trades = vec![
            make_trade(0.0, 0),
            make_trade(10.0, 4),
            make_trade(-5.0, 2),
            make_trade(20.0, 6),
        ];
        let stats = TradeStats::compute(&trades);
        assert_eq!(stats.total_trades, 4);
        assert_relative_eq!(stats.win_rate, 50.0);
        assert_relative_eq!(stats.avg_win, 15.0);
        assert_relative_eq!(stats.avg_loss, -5.0);
        assert_relative_eq!(stats.profit_factor, 6.0);
        assert_relative_eq!(stats.avg_hold_time, 3.0);
    }

    #[test]
    fn profit_factor_infinite_without_losers() {
        let stats = TradeStats::compute(&[make_trade(0.0, 0), make_trade(3.0, 2)]);
        assert_eq!(stats.profit_factor, f64::INFINITY);
        assert_eq!(stats.avg_loss, 0.0);
    }

    #[test]
    fn drawdown_series_tracks_running_peak() {
        let dd = drawdown_series(&make_equity_curve(&[1.0, 1.2, 0.9, 1.3]));
        let values: Vec<f64> = dd.iter().map(|p| p.drawdown).collect();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 0.0);
        assert_relative_eq!(values[2], -25.0, epsilon = 1e-9);
        assert_eq!(values[3], 0.0);
    }

    #[test]
    fn monthly_returns_use_month_end_equity() {
        let curve = vec![
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 30).unwrap(),
                equity: 1.0,
            },
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                equity: 1.1,
            },
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
                equity: 1.0,
            },
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                equity: 1.21,
            },
            EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                equity: 1.089,
            },
        ];
        let months = monthly_returns(&curve);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 2));
        assert_relative_eq!(months[0].return_pct, 10.0, epsilon = 1e-9);
        assert_eq!((months[1].year, months[1].month), (2024, 3));
        assert_relative_eq!(months[1].return_pct, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn monthly_returns_skip_month_after_gap() {
        let point = |y: i32, m: u32, d: u32, equity: f64| EquityPoint {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            equity,
        };
        let curve = vec![
            point(2023, 11, 30, 1.0),
            point(2023, 12, 29, 1.1),
            point(2024, 1, 31, 1.21),
            point(2024, 3, 28, 1.0),
            point(2024, 4, 30, 1.1),
        ];
        let months = monthly_returns(&curve);
        let keys: Vec<(i32, u32)> = months.iter().map(|m| (m.year, m.month)).collect();
        assert_eq!(keys, vec![(2023, 12), (2024, 1), (2024, 4)]);
        assert_relative_eq!(months[1].return_pct, 10.0, epsilon = 1e-9);
        assert_relative_eq!(months[2].return_pct, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn summary_rows_cover_all_figures() {
        let report = analyze_performance(&make_equity_curve(&[1.0, 1.1]), &[make_trade(1.0, 1)]);
        let rows = report.summary_rows();
        assert_eq!(rows.len(), 13);
        assert_eq!(rows[7], ("total_trades", 1.0));
    }
}
