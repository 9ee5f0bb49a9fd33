//! Rule library: evaluates a compiled rule into a raw directional signal.
//!
//! # Evaluation Semantics
//!
//! - Every rule yields one value in {-1, 0, 1} per bar.
//! - Any comparison against an undefined value is false, so bars without
//!   enough history evaluate to 0.
//! - When both the long and the short condition hold on the same bar, the
//!   short condition wins.

use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::roc::{calculate_roc, pct_change};
use crate::domain::indicator::stddev::rolling_std;
use crate::domain::indicator::{Series, defined, rolling_max, rolling_mean, rolling_min, sma};
use crate::domain::indicator_helpers::{annualized_volatility, calc_atr};
use crate::domain::ohlcv::{PriceBar, closes};
use crate::domain::rule::Rule;

pub fn evaluate(rule: &Rule, bars: &[PriceBar]) -> Vec<f64> {
    match *rule {
        Rule::ZScore {
            lookback,
            threshold,
        } => zscore(bars, lookback, threshold),
        Rule::Roc {
            lookback,
            threshold,
        } => roc(bars, lookback, threshold),
        Rule::Channel {
            lookback,
            channel_width,
        } => channel(bars, lookback, channel_width),
        Rule::SupportResistance {
            lookback,
            threshold,
        } => support_resistance(bars, lookback, threshold),
        Rule::SmaCrossover {
            fast_period,
            slow_period,
        } => {
            let c = closes(bars);
            crossover(&sma(&c, fast_period), &sma(&c, slow_period))
        }
        Rule::EmaCrossover {
            fast_period,
            slow_period,
        } => {
            let c = closes(bars);
            crossover(
                &calculate_ema(&c, fast_period),
                &calculate_ema(&c, slow_period),
            )
        }
        Rule::AtrBreakout {
            lookback,
            multiplier,
        } => atr_breakout(bars, lookback, multiplier),
        Rule::VolatilityRegime {
            lookback,
            threshold,
        } => volatility_regime(bars, lookback, threshold),
    }
}

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn directional<L, S>(len: usize, long: L, short: S) -> Vec<f64>
where
    L: Fn(usize) -> bool,
    S: Fn(usize) -> bool,
{
    (0..len)
        .map(|i| {
            if short(i) {
                -1.0
            } else if long(i) {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

fn zscore(bars: &[PriceBar], lookback: usize, threshold: f64) -> Vec<f64> {
    let returns = pct_change(&closes(bars), lookback);
    let mean = rolling_mean(&returns, lookback);
    let std = rolling_std(&returns, lookback);

    let z: Series = returns
        .iter()
        .zip(mean.iter().zip(std.iter()))
        .map(|(r, (m, s))| match (r, m, s) {
            (Some(r), Some(m), Some(s)) if *s != 0.0 => Some((r - m) / s),
            _ => None,
        })
        .collect();

    directional(
        bars.len(),
        |i| gt(z[i], Some(threshold)),
        |i| lt(z[i], Some(-threshold)),
    )
}

fn roc(bars: &[PriceBar], lookback: usize, threshold: f64) -> Vec<f64> {
    let roc = calculate_roc(&closes(bars), lookback);
    directional(
        bars.len(),
        |i| gt(roc[i], Some(threshold)),
        |i| lt(roc[i], Some(-threshold)),
    )
}

fn channel(bars: &[PriceBar], lookback: usize, channel_width: f64) -> Vec<f64> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let rolling_high = rolling_max(&defined(&highs), lookback);
    let rolling_low = rolling_min(&defined(&lows), lookback);

    let bands: Vec<Option<(f64, f64)>> = rolling_high
        .iter()
        .zip(rolling_low.iter())
        .map(|(h, l)| {
            let (h, l) = (h.as_ref()?, l.as_ref()?);
            let mid = (h + l) / 2.0;
            let half_width = channel_width * (h - l) / 2.0;
            Some((mid + half_width, mid - half_width))
        })
        .collect();

    directional(
        bars.len(),
        |i| gt(Some(bars[i].close), bands[i].map(|b| b.0)),
        |i| lt(Some(bars[i].close), bands[i].map(|b| b.1)),
    )
}

fn support_resistance(bars: &[PriceBar], lookback: usize, threshold: f64) -> Vec<f64> {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let resistance = rolling_max(&defined(&highs), lookback);
    let support = rolling_min(&defined(&lows), lookback);
    let limit = Some(threshold / 100.0);

    let distance = |level: Option<f64>, i: usize, above: bool| -> Option<f64> {
        let close = bars[i].close;
        if close == 0.0 {
            return None;
        }
        let level = level?;
        Some(if above {
            (level - close) / close
        } else {
            (close - level) / close
        })
    };

    directional(
        bars.len(),
        |i| lt(distance(resistance[i], i, true), limit),
        |i| lt(distance(support[i], i, false), limit),
    )
}

fn crossover(fast: &[Option<f64>], slow: &[Option<f64>]) -> Vec<f64> {
    directional(
        fast.len(),
        |i| gt(fast[i], slow[i]),
        |i| lt(fast[i], slow[i]),
    )
}

fn atr_breakout(bars: &[PriceBar], lookback: usize, multiplier: f64) -> Vec<f64> {
    let atr = calc_atr(bars, lookback);
    let middle = sma(&closes(bars), lookback);

    let band =
        |i: usize, sign: f64| -> Option<f64> { Some(middle[i]? + sign * multiplier * atr[i]?) };

    directional(
        bars.len(),
        |i| gt(Some(bars[i].close), band(i, 1.0)),
        |i| lt(Some(bars[i].close), band(i, -1.0)),
    )
}

fn volatility_regime(bars: &[PriceBar], lookback: usize, threshold: f64) -> Vec<f64> {
    let vol = annualized_volatility(bars, lookback);
    let avg = rolling_mean(&vol, lookback);

    directional(
        bars.len(),
        |i| lt(vol[i], avg[i].map(|a| a / threshold)),
        |i| gt(vol[i], avg[i].map(|a| a * threshold)),
    )
}
