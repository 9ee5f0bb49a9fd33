//! Signal composition.
//!
//! Each category reduces its rules to the sign of their weighted sum; the
//! composite signal is the weighted average of the category signals, so it
//! always lies in [-1, 1].

use crate::domain::ohlcv::PriceBar;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::evaluate;

/// A compiled category: validated rules paired with their weights.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCategory {
    pub name: String,
    pub weight: f64,
    pub rules: Vec<(Rule, f64)>,
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// sign(sum of weight * rule signal) per bar; all zeros for an empty category.
pub fn category_signal(rules: &[(Rule, f64)], bars: &[PriceBar]) -> Vec<f64> {
    let mut total = vec![0.0; bars.len()];
    for (rule, weight) in rules {
        for (acc, s) in total.iter_mut().zip(evaluate(rule, bars)) {
            *acc += weight * s;
        }
    }
    total.into_iter().map(sign).collect()
}

/// Weighted average of the category signals. All zeros when the categories'
/// total weight is zero.
pub fn composite_signal(categories: &[CompiledCategory], bars: &[PriceBar]) -> Vec<f64> {
    let total_weight: f64 = categories.iter().map(|c| c.weight).sum();
    if total_weight == 0.0 {
        return vec![0.0; bars.len()];
    }

    let mut composite = vec![0.0; bars.len()];
    for category in categories {
        let signal = category_signal(&category.rules, bars);
        tracing::trace!(category = %category.name, "category signal computed");
        for (acc, s) in composite.iter_mut().zip(signal) {
            *acc += category.weight * s;
        }
    }
    composite.into_iter().map(|s| s / total_weight).collect()
}
