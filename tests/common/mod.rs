#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use stratbench::domain::backtest::BacktestConfig;
use stratbench::domain::error::StratbenchError;
pub use stratbench::domain::ohlcv::PriceBar;
use stratbench::domain::rule::{RuleSpec, RuleType};
use stratbench::domain::sizing::{SizingMethod, SizingSpec};
use stratbench::domain::strategy::{CategoryConfig, StrategySpec};
use stratbench::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, StratbenchError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StratbenchError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, StratbenchError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Bars with the given closes on consecutive days from 2024-01-01.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            date: date(2024, 1, 1) + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// A deterministic zig-zag: slow upward drift, swinging direction every 7 bars.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let swing = if (i / 7) % 2 == 0 { 1.0 } else { -0.8 };
            let close = start_price + i as f64 * 0.1 + swing * (i % 7) as f64;
            PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

pub fn single_category(rules: Vec<RuleSpec>, sizing: SizingSpec) -> StrategySpec {
    let mut categories = BTreeMap::new();
    categories.insert("main".to_string(), CategoryConfig { weight: 1.0, rules });
    StrategySpec {
        name: "Test".into(),
        description: "Test strategy".into(),
        categories,
        sizing,
    }
}

pub fn sma_strategy(fast: f64, slow: f64) -> StrategySpec {
    single_category(
        vec![RuleSpec::new(
            RuleType::SmaCrossover,
            &[("fast_period", fast), ("slow_period", slow)],
            1.0,
        )],
        SizingSpec::new(SizingMethod::FixedPercent, &[("position_size", 1.0)]),
    )
}

pub fn sample_config(symbols: &[&str]) -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        data_dir: PathBuf::from("unused"),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        output_dir: None,
    }
}
