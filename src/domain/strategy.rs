//! Strategy specification and compilation.
//!
//! A `StrategySpec` is plain configuration data: named categories of weighted
//! rule specs plus a sizing spec. `compile` validates everything up front so
//! that a bad identifier or parameter fails before any series is computed.

use std::collections::BTreeMap;

use crate::domain::error::StratbenchError;
use crate::domain::rule::RuleSpec;
use crate::domain::signal::CompiledCategory;
use crate::domain::sizing::{Sizing, SizingSpec};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub weight: f64,
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySpec {
    pub name: String,
    pub description: String,
    pub categories: BTreeMap<String, CategoryConfig>,
    pub sizing: SizingSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStrategy {
    pub name: String,
    pub categories: Vec<CompiledCategory>,
    pub sizing: Sizing,
}

impl StrategySpec {
    pub fn compile(&self) -> Result<CompiledStrategy, StratbenchError> {
        let mut categories = Vec::with_capacity(self.categories.len());

        for (name, category) in &self.categories {
            if !category.weight.is_finite() || category.weight < 0.0 {
                return Err(StratbenchError::invalid(
                    format!("category {name}"),
                    "weight must be a non-negative number",
                ));
            }
            let rules = category
                .rules
                .iter()
                .map(|spec| Ok((spec.compile()?, spec.weight)))
                .collect::<Result<Vec<_>, StratbenchError>>()?;
            categories.push(CompiledCategory {
                name: name.clone(),
                weight: category.weight,
                rules,
            });
        }

        Ok(CompiledStrategy {
            name: self.name.clone(),
            categories,
            sizing: self.sizing.compile()?,
        })
    }
}

impl CompiledStrategy {
    pub fn rule_count(&self) -> usize {
        self.categories.iter().map(|c| c.rules.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{Rule, RuleType};
    use crate::domain::sizing::SizingMethod;

    fn sample_spec() -> StrategySpec {
        let mut categories = BTreeMap::new();
        categories.insert(
            "trend".to_string(),
            CategoryConfig {
                weight: 0.6,
                rules: vec![RuleSpec::new(
                    RuleType::SmaCrossover,
                    &[("fast_period", 10.0), ("slow_period", 50.0)],
                    1.0,
                )],
            },
        );
        categories.insert(
            "momentum".to_string(),
            CategoryConfig {
                weight: 0.4,
                rules: vec![
                    RuleSpec::new(RuleType::Roc, &[("lookback", 20.0), ("threshold", 2.0)], 1.0),
                    RuleSpec::new(
                        RuleType::ZScore,
                        &[("lookback", 20.0), ("threshold", 1.5)],
                        0.5,
                    ),
                ],
            },
        );
        StrategySpec {
            name: "Blend".into(),
            description: "Trend plus momentum".into(),
            categories,
            sizing: SizingSpec::new(SizingMethod::FixedPercent, &[("position_size", 0.1)]),
        }
    }

    #[test]
    fn compile_sample_strategy() {
        let compiled = sample_spec().compile().unwrap();
        assert_eq!(compiled.name, "Blend");
        assert_eq!(compiled.categories.len(), 2);
        assert_eq!(compiled.rule_count(), 3);
        // BTreeMap order
        assert_eq!(compiled.categories[0].name, "momentum");
        assert_eq!(
            compiled.categories[1].rules[0],
            (
                Rule::SmaCrossover {
                    fast_period: 10,
                    slow_period: 50
                },
                1.0
            )
        );
        assert_eq!(compiled.sizing, Sizing::FixedPercent { position_size: 0.1 });
    }

    #[test]
    fn compile_rejects_negative_category_weight() {
        let mut spec = sample_spec();
        spec.categories.get_mut("trend").unwrap().weight = -1.0;
        let err = spec.compile().unwrap_err();
        assert!(err.to_string().contains("category trend"));
    }

    #[test]
    fn compile_propagates_rule_errors() {
        let mut spec = sample_spec();
        spec.categories
            .get_mut("momentum")
            .unwrap()
            .rules
            .push(RuleSpec::new(RuleType::Channel, &[("lookback", 20.0)], 1.0));
        let err = spec.compile().unwrap_err();
        assert!(matches!(err, StratbenchError::RuleInvalid { .. }));
    }

    #[test]
    fn empty_category_compiles() {
        let mut spec = sample_spec();
        spec.categories.insert(
            "idle".into(),
            CategoryConfig {
                weight: 1.0,
                rules: vec![],
            },
        );
        let compiled = spec.compile().unwrap();
        assert_eq!(compiled.categories.len(), 3);
        assert_eq!(compiled.rule_count(), 3);
    }
}
