//! Equity curve simulation.

use chrono::NaiveDate;

use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Compounds close-to-close returns scaled by the position held on each bar,
/// starting from 1.0. A bar with an undefined position or return carries the
/// previous equity forward.
pub fn simulate_equity(bars: &[PriceBar], positions: &[Option<f64>]) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(bars.len());
    let mut equity = 1.0;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let ret = bar.simple_return(bars[i - 1].close);
            if let (Some(position), Some(ret)) = (positions.get(i).copied().flatten(), ret) {
                equity *= 1.0 + position * ret;
            }
        }
        curve.push(EquityPoint {
            date: bar.date,
            equity,
        });
    }

    curve
}
