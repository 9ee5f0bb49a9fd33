//! Rule registry.
//!
//! A `RuleSpec` is plain data (identifier, numeric parameters, weight).
//! `RuleSpec::compile` validates it into a typed `Rule`, which is what the
//! rule library evaluates. Nothing here executes caller-supplied code.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::StratbenchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    ZScore,
    Roc,
    Channel,
    SupportResistance,
    SmaCrossover,
    EmaCrossover,
    AtrBreakout,
    VolatilityRegime,
}

impl RuleType {
    pub const ALL: [RuleType; 8] = [
        RuleType::ZScore,
        RuleType::Roc,
        RuleType::Channel,
        RuleType::SupportResistance,
        RuleType::SmaCrossover,
        RuleType::EmaCrossover,
        RuleType::AtrBreakout,
        RuleType::VolatilityRegime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleType::ZScore => "zscore",
            RuleType::Roc => "roc",
            RuleType::Channel => "channel",
            RuleType::SupportResistance => "support_resistance",
            RuleType::SmaCrossover => "sma_crossover",
            RuleType::EmaCrossover => "ema_crossover",
            RuleType::AtrBreakout => "atr_breakout",
            RuleType::VolatilityRegime => "volatility_regime",
        }
    }

    /// Parameter names the rule requires, in evaluation order.
    pub fn parameters(self) -> &'static [&'static str] {
        match self {
            RuleType::ZScore
            | RuleType::Roc
            | RuleType::SupportResistance
            | RuleType::VolatilityRegime => &["lookback", "threshold"],
            RuleType::Channel => &["lookback", "channel_width"],
            RuleType::SmaCrossover | RuleType::EmaCrossover => &["fast_period", "slow_period"],
            RuleType::AtrBreakout => &["lookback", "multiplier"],
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuleType {
    type Err = StratbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        RuleType::ALL
            .into_iter()
            .find(|t| t.name() == key)
            .ok_or(StratbenchError::UnknownRule { name: key })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSpec {
    pub rule_type: RuleType,
    pub parameters: BTreeMap<String, f64>,
    pub weight: f64,
}

/// A validated rule with typed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    ZScore { lookback: usize, threshold: f64 },
    Roc { lookback: usize, threshold: f64 },
    Channel { lookback: usize, channel_width: f64 },
    SupportResistance { lookback: usize, threshold: f64 },
    SmaCrossover { fast_period: usize, slow_period: usize },
    EmaCrossover { fast_period: usize, slow_period: usize },
    AtrBreakout { lookback: usize, multiplier: f64 },
    VolatilityRegime { lookback: usize, threshold: f64 },
}

impl RuleSpec {
    pub fn new(rule_type: RuleType, parameters: &[(&str, f64)], weight: f64) -> Self {
        RuleSpec {
            rule_type,
            parameters: parameters
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            weight,
        }
    }

    pub fn compile(&self) -> Result<Rule, StratbenchError> {
        let owner = format!("rule {}", self.rule_type);
        if !self.weight.is_finite() {
            return Err(StratbenchError::invalid(owner, "weight must be finite"));
        }

        let allowed = self.rule_type.parameters();
        if let Some(extra) = self.parameters.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(StratbenchError::invalid(
                owner,
                format!("unexpected parameter '{extra}'"),
            ));
        }

        let number = |key: &str| -> Result<f64, StratbenchError> {
            let value = self.parameters.get(key).copied().ok_or_else(|| {
                StratbenchError::invalid(&owner, format!("missing parameter '{key}'"))
            })?;
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

        let rule = match self.rule_type {
            RuleType::ZScore => Rule::ZScore {
                lookback: period("lookback")?,
                threshold: number("threshold")?,
            },
            RuleType::Roc => Rule::Roc {
                lookback: period("lookback")?,
                threshold: number("threshold")?,
            },
            RuleType::Channel => Rule::Channel {
                lookback: period("lookback")?,
                channel_width: number("channel_width")?,
            },
            RuleType::SupportResistance => Rule::SupportResistance {
                lookback: period("lookback")?,
                threshold: number("threshold")?,
            },
            RuleType::SmaCrossover => Rule::SmaCrossover {
                fast_period: period("fast_period")?,
                slow_period: period("slow_period")?,
            },
            RuleType::EmaCrossover => Rule::EmaCrossover {
                fast_period: period("fast_period")?,
                slow_period: period("slow_period")?,
            },
            RuleType::AtrBreakout => Rule::AtrBreakout {
                lookback: period("lookback")?,
                multiplier: number("multiplier")?,
            },
            RuleType::VolatilityRegime => {
                let threshold = number("threshold")?;
                if threshold <= 0.0 {
                    return Err(StratbenchError::invalid(
                        &owner,
                        "parameter 'threshold' must be positive",
                    ));
                }
                Rule::VolatilityRegime {
                    lookback: period("lookback")?,
                    threshold,
                }
            }
        };

        Ok(rule)
    }
}

impl Rule {
    pub fn rule_type(&self) -> RuleType {
        match self {
            Rule::ZScore { .. } => RuleType::ZScore,
            Rule::Roc { .. } => RuleType::Roc,
            Rule::Channel { .. } => RuleType::Channel,
            Rule::SupportResistance { .. } => RuleType::SupportResistance,
            Rule::SmaCrossover { .. } => RuleType::SmaCrossover,
            Rule::EmaCrossover { .. } => RuleType::EmaCrossover,
            Rule::AtrBreakout { .. } => RuleType::AtrBreakout,
            Rule::VolatilityRegime { .. } => RuleType::VolatilityRegime,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::ZScore { lookback, threshold }
            | Rule::Roc { lookback, threshold }
            | Rule::SupportResistance { lookback, threshold }
            | Rule::VolatilityRegime { lookback, threshold } => {
                write!(f, "{}({}, {})", self.rule_type(), lookback, threshold)
            }
            Rule::Channel {
                lookback,
                channel_width,
            } => write!(f, "channel({}, {})", lookback, channel_width),
            Rule::SmaCrossover {
                fast_period,
                slow_period,
            }
            | Rule::EmaCrossover {
                fast_period,
                slow_period,
            } => write!(f, "{}({}, {})", self.rule_type(), fast_period, slow_period),
            Rule::AtrBreakout {
                lookback,
                multiplier,
            } => write!(f, "atr_breakout({}, {})", lookback, multiplier),
        }
    }
}
