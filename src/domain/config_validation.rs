//! Configuration validation and strategy assembly.
//!
//! The `[backtest]` section is checked field by field before any data is
//! loaded. The strategy is assembled from the `[strategy]` section, one
//! section per category, one section per rule and a `[sizing]` section.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::StratbenchError;
use crate::domain::rule::{RuleSpec, RuleType};
use crate::domain::sizing::{SizingMethod, SizingSpec};
use crate::domain::strategy::{CategoryConfig, StrategySpec};
use crate::ports::config_port::ConfigPort;

/// Validates the `[backtest]` section and returns it as typed values.
pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, StratbenchError> {
    let (start_date, end_date) = validate_dates(config)?;
    let data_dir = PathBuf::from(required(config, "backtest", "data_dir")?);
    let symbols = validate_symbols(config)?;
    Ok(BacktestConfig {
        start_date,
        end_date,
        data_dir,
        symbols,
        output_dir: non_empty(config, "backtest", "output_dir").map(PathBuf::from),
    })
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, StratbenchError> {
    non_empty(config, section, key).ok_or_else(|| StratbenchError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratbenchError {
    StratbenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), StratbenchError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok((start_date, end_date))
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, StratbenchError> {
    let value = required(config, "backtest", field)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            field,
            format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<Vec<String>, StratbenchError> {
    let (key, raw) = match (
        non_empty(config, "backtest", "symbols"),
        non_empty(config, "backtest", "symbol"),
    ) {
        (Some(list), _) => ("symbols", list),
        (None, Some(single)) => ("symbol", single),
        (None, None) => {
            return Err(StratbenchError::ConfigMissing {
                section: "backtest".to_string(),
                key: "symbol".to_string(),
            });
        }
    };
    parse_list(&raw)
        .map(|symbols| symbols.into_iter().map(|s| s.to_uppercase()).collect())
        .and_then(|symbols: Vec<String>| reject_duplicates(symbols))
        .map_err(|reason| invalid("backtest", key, reason))
}

/// Splits a comma-separated list, rejecting empty entries.
pub fn parse_list(input: &str) -> Result<Vec<String>, String> {
    input
        .split(',')
        .map(|token| {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                Err("empty entry in list".to_string())
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

fn reject_duplicates(items: Vec<String>) -> Result<Vec<String>, String> {
    let mut seen = HashSet::new();
    for item in &items {
        if !seen.insert(item.to_lowercase()) {
            return Err(format!("duplicate entry: {item}"));
        }
    }
    Ok(items)
}

fn parse_number(section: &str, key: &str, raw: &str) -> Result<f64, StratbenchError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| invalid(section, key, format!("'{raw}' is not a number")))
}

/// Every key of `section` except `skip`, parsed as a number.
fn numeric_params(
    config: &dyn ConfigPort,
    section: &str,
    skip: &[&str],
) -> Result<BTreeMap<String, f64>, StratbenchError> {
    let mut params = BTreeMap::new();
    for key in config.keys(section) {
        if skip.contains(&key.as_str()) {
            continue;
        }
        let raw = required(config, section, &key)?;
        params.insert(key.clone(), parse_number(section, &key, &raw)?);
    }
    Ok(params)
}

fn build_rule_spec(config: &dyn ConfigPort, section: &str) -> Result<RuleSpec, StratbenchError> {
    if !config.has_section(section) {
        return Err(StratbenchError::ConfigMissing {
            section: section.to_string(),
            key: "type".to_string(),
        });
    }
    let rule_type: RuleType = required(config, section, "type")?.parse()?;
    let weight = match non_empty(config, section, "weight") {
        Some(raw) => parse_number(section, "weight", &raw)?,
        None => 1.0,
    };
    Ok(RuleSpec {
        rule_type,
        parameters: numeric_params(config, section, &["type", "weight"])?,
        weight,
    })
}

fn build_category(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<CategoryConfig, StratbenchError> {
    let weight = parse_number(section, "weight", &required(config, section, "weight")?)?;
    if weight < 0.0 {
        return Err(invalid(section, "weight", "weight must be non-negative"));
    }

    let rules = match non_empty(config, section, "rules") {
        Some(raw) => parse_list(&raw)
            .and_then(reject_duplicates)
            .map_err(|reason| invalid(section, "rules", reason))?
            .iter()
            .map(|name| build_rule_spec(config, name))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(CategoryConfig { weight, rules })
}

fn build_sizing_spec(config: &dyn ConfigPort) -> Result<SizingSpec, StratbenchError> {
    let method: SizingMethod = required(config, "sizing", "method")?.parse()?;
    Ok(SizingSpec {
        method,
        params: numeric_params(config, "sizing", &["method"])?,
    })
}

/// Assembles the strategy described by the configuration. Only the shape is
/// checked here; `StrategySpec::compile` validates rule and sizing values.
pub fn build_strategy_spec(config: &dyn ConfigPort) -> Result<StrategySpec, StratbenchError> {
    let names = parse_list(&required(config, "strategy", "categories")?)
        .and_then(reject_duplicates)
        .map_err(|reason| invalid("strategy", "categories", reason))?;

    let mut categories = BTreeMap::new();
    for name in names {
        let key = name.to_lowercase();
        let category = build_category(config, &key)?;
        categories.insert(key, category);
    }

    Ok(StrategySpec {
        name: non_empty(config, "strategy", "name").unwrap_or_else(|| "unnamed".to_string()),
        description: non_empty(config, "strategy", "description").unwrap_or_default(),
        categories,
        sizing: build_sizing_spec(config)?,
    })
}
