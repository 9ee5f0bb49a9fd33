//! Backtest pipeline.
//!
//! price bars → composite signal → positions → {trades, equity curve}.
//! Every stage is a pure function of its inputs, so identical inputs always
//! produce identical outputs.

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::equity::{EquityPoint, simulate_equity};
use crate::domain::error::StratbenchError;
use crate::domain::ohlcv::{PriceBar, validate_price_table};
use crate::domain::signal::composite_signal;
use crate::domain::strategy::{CompiledStrategy, StrategySpec};
use crate::domain::trade::{Trade, generate_trades};

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data_dir: PathBuf,
    pub symbols: Vec<String>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub signal: Vec<f64>,
    pub positions: Vec<Option<f64>>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Engine boundary result: either the simulated series or a message.
#[derive(Debug, Clone, PartialEq)]
pub enum BacktestOutcome {
    Success {
        trades: Vec<Trade>,
        equity_curve: Vec<EquityPoint>,
        positions: Vec<Option<f64>>,
    },
    Error {
        message: String,
    },
}

impl From<Result<BacktestResult, StratbenchError>> for BacktestOutcome {
    fn from(result: Result<BacktestResult, StratbenchError>) -> Self {
        match result {
            Ok(r) => BacktestOutcome::Success {
                trades: r.trades,
                equity_curve: r.equity_curve,
                positions: r.positions,
            },
            Err(e) => BacktestOutcome::Error {
                message: e.to_string(),
            },
        }
    }
}

impl BacktestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BacktestOutcome::Success { .. })
    }
}

/// Runs a compiled strategy over a validated price table.
pub fn run_backtest(
    bars: &[PriceBar],
    strategy: &CompiledStrategy,
) -> Result<BacktestResult, StratbenchError> {
    validate_price_table(bars)?;

    let signal = composite_signal(&strategy.categories, bars);
    let positions = strategy.sizing.size_positions(bars, &signal);
    let trades = generate_trades(bars, &positions);
    let equity_curve = simulate_equity(bars, &positions);

    tracing::debug!(
        strategy = %strategy.name,
        bars = bars.len(),
        sized = positions.iter().filter(|p| p.is_some()).count(),
        trades = trades.len(),
        "backtest complete"
    );

    Ok(BacktestResult {
        signal,
        positions,
        trades,
        equity_curve,
    })
}

/// Compiles `spec` and runs it, folding every failure into
/// `BacktestOutcome::Error`.
pub fn run(bars: &[PriceBar], spec: &StrategySpec) -> BacktestOutcome {
    spec.compile()
        .and_then(|strategy| run_backtest(bars, &strategy))
        .into()
}
