//! Trade event generation.
//!
//! Walks the position series and emits one `Trade` per defined position
//! change, filled at that bar's close.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub date: NaiveDate,
    pub fill_price: f64,
    /// Change in position, signed.
    pub size: f64,
    pub direction: Direction,
    pub resulting_position: f64,
    pub realized_pnl: f64,
    pub hold_time_days: i64,
}

/// Emits a trade at every bar whose defined position differs from the
/// current one. Undefined positions leave the state untouched.
///
/// Realized PnL is `(close - entry_price) * current_position`, where the
/// entry price is re-based to the fill on every change to a non-zero
/// position. Partial adjustments therefore realize against the last fill,
/// not a weighted cost basis.
pub fn generate_trades(bars: &[PriceBar], positions: &[Option<f64>]) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut current = 0.0;
    let mut entry: Option<(f64, NaiveDate)> = None;

    for (bar, position) in bars.iter().zip(positions) {
        let Some(target) = *position else {
            continue;
        };
        if target == current {
            continue;
        }

        let (realized_pnl, hold_time_days) = match entry {
            Some((entry_price, entry_date)) if current != 0.0 => (
                (bar.close - entry_price) * current,
                (bar.date - entry_date).num_days(),
            ),
            _ => (0.0, 0),
        };

        trades.push(Trade {
            date: bar.date,
            fill_price: bar.close,
            size: target - current,
            direction: if target > current {
                Direction::Buy
            } else {
                Direction::Sell
            },
            resulting_position: target,
            realized_pnl,
            hold_time_days,
        });

        if target != 0.0 {
            entry = Some((bar.close, bar.date));
        }
        current = target;
    }

    trades
}
