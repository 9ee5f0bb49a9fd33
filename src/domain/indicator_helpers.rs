//! Shared helper functions for indicator calculations.
//!
//! ATR and annualized volatility are used both by the rule library and by the
//! position sizers, so they live outside the per-indicator modules.

use crate::domain::indicator::roc::pct_change;
use crate::domain::indicator::stddev::rolling_std;
use crate::domain::indicator::{Series, rolling_mean};
use crate::domain::ohlcv::{PriceBar, closes};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// True range per bar; the first bar has no previous close and uses high - low.
pub fn true_range_series(bars: &[PriceBar]) -> Series {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                Some(bar.high - bar.low)
            } else {
                Some(bar.true_range(bars[i - 1].close))
            }
        })
        .collect()
}

/// Average true range as a simple rolling mean of the true range.
pub fn calc_atr(bars: &[PriceBar], period: usize) -> Series {
    rolling_mean(&true_range_series(bars), period)
}

/// Rolling sample deviation of one-bar returns, scaled by sqrt(252).
pub fn annualized_volatility(bars: &[PriceBar], lookback: usize) -> Series {
    let returns = pct_change(&closes(bars), 1);
    rolling_std(&returns, lookback)
        .into_iter()
        .map(|v| v.map(|s| s * TRADING_DAYS_PER_YEAR.sqrt()))
        .collect()
}
