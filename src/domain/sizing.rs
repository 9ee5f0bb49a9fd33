//! Position sizing policies.
//!
//! A sizer maps the composite signal and the price history to a signed
//! exposure fraction per bar. `None` marks a bar where the policy could not
//! size the position (undefined or zero volatility/ATR); downstream stages
//! treat it as "no exposure decision". A zero signal is always flat.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::StratbenchError;
use crate::domain::indicator::mean_defined;
use crate::domain::indicator_helpers::{annualized_volatility, calc_atr};
use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizingMethod {
    FixedPercent,
    VolatilityTargeting,
    EqualRisk,
    InverseVolatility,
    KellyCriterion,
}

impl SizingMethod {
    pub const ALL: [SizingMethod; 5] = [
        SizingMethod::FixedPercent,
        SizingMethod::VolatilityTargeting,
        SizingMethod::EqualRisk,
        SizingMethod::InverseVolatility,
        SizingMethod::KellyCriterion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SizingMethod::FixedPercent => "fixed_percent",
            SizingMethod::VolatilityTargeting => "volatility_targeting",
            SizingMethod::EqualRisk => "equal_risk",
            SizingMethod::InverseVolatility => "inverse_volatility",
            SizingMethod::KellyCriterion => "kelly_criterion",
        }
    }

    /// Accepted parameters and their defaults.
    fn parameters(self) -> &'static [(&'static str, f64)] {
        match self {
            SizingMethod::FixedPercent => &[("position_size", 0.01), ("fixed_fraction", 0.01)],
            SizingMethod::VolatilityTargeting => {
                &[("target_vol", 0.20), ("lookback", 60.0), ("max_size", 0.30)]
            }
            SizingMethod::EqualRisk => &[("risk_per_trade", 0.01), ("atr_periods", 14.0)],
            SizingMethod::InverseVolatility => &[("lookback", 60.0), ("max_size", 0.30)],
            SizingMethod::KellyCriterion => {
                &[("win_rate", 0.5), ("profit_ratio", 2.0), ("max_size", 0.30)]
            }
        }
    }
}

impl fmt::Display for SizingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SizingMethod {
    type Err = StratbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        if key == "fixed_percentage" {
            return Ok(SizingMethod::FixedPercent);
        }
        SizingMethod::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or(StratbenchError::UnknownSizing { name: key })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizingSpec {
    pub method: SizingMethod,
    pub params: BTreeMap<String, f64>,
}

/// A validated sizing policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    FixedPercent {
        position_size: f64,
    },
    VolatilityTargeting {
        target_vol: f64,
        lookback: usize,
        max_size: f64,
    },
    EqualRisk {
        risk_per_trade: f64,
        atr_periods: usize,
    },
    InverseVolatility {
        lookback: usize,
        max_size: f64,
    },
    KellyCriterion {
        win_rate: f64,
        profit_ratio: f64,
        max_size: f64,
    },
}

/// kelly = (b*p - (1 - p)) / b
pub fn kelly_fraction(win_rate: f64, profit_ratio: f64) -> f64 {
    (profit_ratio * win_rate - (1.0 - win_rate)) / profit_ratio
}

impl SizingSpec {
    pub fn new(method: SizingMethod, params: &[(&str, f64)]) -> Self {
        SizingSpec {
            method,
            params: params.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    pub fn compile(&self) -> Result<Sizing, StratbenchError> {
        let owner = format!("sizing {}", self.method);
        let accepted = self.method.parameters();

        if let Some(extra) = self
            .params
            .keys()
            .find(|k| !accepted.iter().any(|(name, _)| name == k))
        {
            return Err(StratbenchError::invalid(
                owner,
                format!("unexpected parameter '{extra}'"),
            ));
        }

        let number = |key: &str| -> Result<f64, StratbenchError> {
            let default = accepted
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, d)| *d)
                .unwrap_or(0.0);
            let value = self.params.get(key).copied().unwrap_or(default);
            if value.is_finite() {
                Ok(value)
            } else {
                Err(StratbenchError::invalid(
                    &owner,
                    format!("parameter '{key}' must be finite"),
                ))
            }
        };
        let period = |key: &str| -> Result<usize, StratbenchError> {
            let value = number(key)?;
            if value >= 1.0 && value.fract() == 0.0 {
                Ok(value as usize)
            } else {
                Err(StratbenchError::invalid(
                    &owner,
                    format!("parameter '{key}' must be a positive integer"),
                ))
            }
        };
        let cap = |key: &str| -> Result<f64, StratbenchError> {
            let value = number(key)?;
            if value >= 0.0 {
                Ok(value)
            } else {
                Err(StratbenchError::invalid(
                    &owner,
                    format!("parameter '{key}' must be non-negative"),
                ))
            }
        };

        let sizing = match self.method {
            SizingMethod::FixedPercent => {
                let position_size = if self.params.contains_key("position_size") {
                    number("position_size")?
                } else {
                    number("fixed_fraction")?
                };
                Sizing::FixedPercent { position_size }
            }
            SizingMethod::VolatilityTargeting => Sizing::VolatilityTargeting {
                target_vol: number("target_vol")?,
                lookback: period("lookback")?,
                max_size: cap("max_size")?,
            },
            SizingMethod::EqualRisk => Sizing::EqualRisk {
                risk_per_trade: number("risk_per_trade")?,
                atr_periods: period("atr_periods")?,
            },
            SizingMethod::InverseVolatility => Sizing::InverseVolatility {
                lookback: period("lookback")?,
                max_size: cap("max_size")?,
            },
            SizingMethod::KellyCriterion => {
                let win_rate = number("win_rate")?;
                if !(0.0..=1.0).contains(&win_rate) {
                    return Err(StratbenchError::invalid(
                        &owner,
                        "parameter 'win_rate' must be within [0, 1]",
                    ));
                }
                let profit_ratio = number("profit_ratio")?;
                if profit_ratio <= 0.0 {
                    return Err(StratbenchError::invalid(
                        &owner,
                        "parameter 'profit_ratio' must be positive",
                    ));
                }
                let max_size = cap("max_size")?;
                let kelly = kelly_fraction(win_rate, profit_ratio);
                if kelly < 0.0 {
                    tracing::warn!(kelly, "negative kelly fraction inverts the signal");
                }
                Sizing::KellyCriterion {
                    win_rate,
                    profit_ratio,
                    max_size,
                }
            }
        };

        Ok(sizing)
    }
}

impl Sizing {
    pub fn method(&self) -> SizingMethod {
        match self {
            Sizing::FixedPercent { .. } => SizingMethod::FixedPercent,
            Sizing::VolatilityTargeting { .. } => SizingMethod::VolatilityTargeting,
            Sizing::EqualRisk { .. } => SizingMethod::EqualRisk,
            Sizing::InverseVolatility { .. } => SizingMethod::InverseVolatility,
            Sizing::KellyCriterion { .. } => SizingMethod::KellyCriterion,
        }
    }

    /// Sizes every bar of `signal`, which must be aligned with `bars`.
    pub fn size_positions(&self, bars: &[PriceBar], signal: &[f64]) -> Vec<Option<f64>> {
        let scaled = |per_bar: &dyn Fn(usize, f64) -> Option<f64>| scale_each(signal, per_bar);

        match *self {
            Sizing::FixedPercent { position_size } => scaled(&|_, s| Some(s * position_size)),
            Sizing::VolatilityTargeting {
                target_vol,
                lookback,
                max_size,
            } => {
                let vol = annualized_volatility(bars, lookback);
                scaled(&|i, s| match vol[i] {
                    Some(v) if v != 0.0 => Some((s * (target_vol / v)).clamp(-max_size, max_size)),
                    _ => None,
                })
            }
            Sizing::EqualRisk {
                risk_per_trade,
                atr_periods,
            } => {
                let atr = calc_atr(bars, atr_periods);
                scaled(&|i, s| {
                    let close = bars[i].close;
                    match atr[i] {
                        Some(a) if a != 0.0 && close != 0.0 => {
                            Some(s * (risk_per_trade / (a / close)))
                        }
                        _ => None,
                    }
                })
            }
            Sizing::InverseVolatility { lookback, max_size } => {
                let vol = annualized_volatility(bars, lookback);
                let norm = mean_defined(&vol);
                scaled(&|i, s| match (vol[i], norm) {
                    (Some(v), Some(m)) if v != 0.0 && m != 0.0 => {
                        Some((s * (1.0 / v) / m).clamp(-max_size, max_size))
                    }
                    _ => None,
                })
            }
            Sizing::KellyCriterion {
                win_rate,
                profit_ratio,
                max_size,
            } => {
                let fraction = (0.5 * kelly_fraction(win_rate, profit_ratio)).min(max_size);
                scaled(&|_, s| Some(s * fraction))
            }
        }
    }
}

fn scale_each(signal: &[f64], per_bar: &dyn Fn(usize, f64) -> Option<f64>) -> Vec<Option<f64>> {
    signal
        .iter()
        .enumerate()
        .map(|(i, &s)| if s == 0.0 { Some(0.0) } else { per_bar(i, s) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(rows: &[(f64, f64, f64)]) -> Vec<PriceBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn flat_bars(n: usize, close: f64) -> Vec<PriceBar> {
        make_bars(&vec![(close, close, close); n])
    }

    #[test]
    fn method_names_parse() {
        for m in SizingMethod::ALL {
            assert_eq!(m.name().parse::<SizingMethod>().unwrap(), m);
        }
        assert_eq!(
            "fixed_percentage".parse::<SizingMethod>().unwrap(),
            SizingMethod::FixedPercent
        );
    }

    #[test]
    fn unknown_method_is_error() {
        let err = "martingale".parse::<SizingMethod>().unwrap_err();
        assert!(matches!(err, StratbenchError::UnknownSizing { name } if name == "martingale"));
    }

    #[test]
    fn compile_uses_defaults() {
        let sizing = SizingSpec::new(SizingMethod::VolatilityTargeting, &[])
            .compile()
            .unwrap();
        assert_eq!(
            sizing,
            Sizing::VolatilityTargeting {
                target_vol: 0.20,
                lookback: 60,
                max_size: 0.30
            }
        );
    }

    #[test]
    fn compile_fixed_fraction_alias() {
        let sizing = SizingSpec::new(SizingMethod::FixedPercent, &[("fixed_fraction", 0.5)])
            .compile()
            .unwrap();
        assert_eq!(sizing, Sizing::FixedPercent { position_size: 0.5 });
    }

    #[test]
    fn compile_rejects_unknown_parameter() {
        let err = SizingSpec::new(SizingMethod::EqualRisk, &[("stop", 2.0)])
            .compile()
            .unwrap_err();
        assert!(err.to_string().contains("unexpected parameter 'stop'"));
    }

    #[test]
    fn compile_rejects_bad_kelly_inputs() {
        assert!(
            SizingSpec::new(SizingMethod::KellyCriterion, &[("win_rate", 1.5)])
                .compile()
                .is_err()
        );
        assert!(
            SizingSpec::new(SizingMethod::KellyCriterion, &[("profit_ratio", 0.0)])
                .compile()
                .is_err()
        );
    }

    #[test]
    fn compile_rejects_negative_cap() {
        assert!(
            SizingSpec::new(SizingMethod::InverseVolatility, &[("max_size", -0.1)])
                .compile()
                .is_err()
        );
    }

    #[test]
    fn fixed_percent_scales_signal() {
        let bars = flat_bars(3, 100.0);
        let sizing = Sizing::FixedPercent { position_size: 0.5 };
        assert_eq!(
            sizing.size_positions(&bars, &[1.0, -0.5, 0.0]),
            vec![Some(0.5), Some(-0.25), Some(0.0)]
        );
    }

    #[test]
    fn kelly_half_fraction() {
        assert!((kelly_fraction(0.6, 2.0) - 0.4).abs() < 1e-12);
        let bars = flat_bars(2, 100.0);
        let sizing = Sizing::KellyCriterion {
            win_rate: 0.6,
            profit_ratio: 2.0,
            max_size: 1.0,
        };
        let positions = sizing.size_positions(&bars, &[1.0, -1.0]);
        assert!((positions[0].unwrap() - 0.2).abs() < 1e-12);
        assert!((positions[1].unwrap() + 0.2).abs() < 1e-12);
    }

    #[test]
    fn kelly_capped_by_max_size() {
        let bars = flat_bars(1, 100.0);
        let sizing = Sizing::KellyCriterion {
            win_rate: 0.6,
            profit_ratio: 2.0,
            max_size: 0.1,
        };
        let positions = sizing.size_positions(&bars, &[1.0]);
        assert!((positions[0].unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn volatility_targeting_undefined_during_warmup() {
        let bars = make_bars(&[
            (100.0, 100.0, 100.0),
            (101.0, 101.0, 101.0),
            (99.0, 99.0, 99.0),
            (102.0, 102.0, 102.0),
        ]);
        let sizing = Sizing::VolatilityTargeting {
            target_vol: 0.2,
            lookback: 2,
            max_size: 100.0,
        };
        let positions = sizing.size_positions(&bars, &[1.0, 1.0, 1.0, 0.0]);
        assert_eq!(positions[0], None);
        assert_eq!(positions[1], None);
        assert!(positions[2].unwrap() > 0.0);
        assert_eq!(positions[3], Some(0.0));
    }

    #[test]
    fn volatility_targeting_clips_to_max_size() {
        let bars = make_bars(&[
            (100.0, 100.0, 100.0),
            (100.1, 100.1, 100.1),
            (100.0, 100.0, 100.0),
        ]);
        let sizing = Sizing::VolatilityTargeting {
            target_vol: 0.2,
            lookback: 2,
            max_size: 0.3,
        };
        let positions = sizing.size_positions(&bars, &[-1.0, -1.0, -1.0]);
        assert_eq!(positions[2], Some(-0.3));
    }

    #[test]
    fn zero_volatility_is_undefined() {
        let bars = flat_bars(5, 100.0);
        let sizing = Sizing::VolatilityTargeting {
            target_vol: 0.2,
            lookback: 2,
            max_size: 0.3,
        };
        let positions = sizing.size_positions(&bars, &[1.0; 5]);
        assert!(positions.iter().all(Option::is_none));
    }

    #[test]
    fn equal_risk_uses_atr_over_close() {
        let bars = make_bars(&[
            (102.0, 98.0, 100.0),
            (102.0, 98.0, 100.0),
            (102.0, 98.0, 100.0),
        ]);
        let sizing = Sizing::EqualRisk {
            risk_per_trade: 0.01,
            atr_periods: 2,
        };
        let positions = sizing.size_positions(&bars, &[1.0, 1.0, -1.0]);
        assert_eq!(positions[0], None);
        // ATR 4 on close 100 → 0.01 / 0.04 = 0.25
        assert!((positions[1].unwrap() - 0.25).abs() < 1e-12);
        assert!((positions[2].unwrap() + 0.25).abs() < 1e-12);
    }

    #[test]
    fn inverse_volatility_normalizes_by_mean() {
        let bars = make_bars(&[
            (100.0, 100.0, 100.0),
            (101.0, 101.0, 101.0),
            (100.0, 100.0, 100.0),
            (102.0, 102.0, 102.0),
        ]);
        let vol = annualized_volatility(&bars, 2);
        let mean = mean_defined(&vol).unwrap();
        let sizing = Sizing::InverseVolatility {
            lookback: 2,
            max_size: 1e9,
        };
        let positions = sizing.size_positions(&bars, &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(positions[1], None);
        let expected = 1.0 / vol[3].unwrap() / mean;
        assert!((positions[3].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_signal_is_flat_for_every_policy() {
        let bars = flat_bars(4, 100.0);
        let policies = [
            Sizing::FixedPercent { position_size: 0.5 },
            Sizing::VolatilityTargeting {
                target_vol: 0.2,
                lookback: 2,
                max_size: 0.3,
            },
            Sizing::EqualRisk {
                risk_per_trade: 0.01,
                atr_periods: 2,
            },
            Sizing::InverseVolatility {
                lookback: 2,
                max_size: 0.3,
            },
            Sizing::KellyCriterion {
                win_rate: 0.6,
                profit_ratio: 2.0,
                max_size: 0.3,
            },
        ];
        for sizing in policies {
            let positions = sizing.size_positions(&bars, &[0.0; 4]);
            assert!(positions.iter().all(|p| *p == Some(0.0)), "{:?}", sizing);
        }
    }
}
