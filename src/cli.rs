//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{build_strategy_spec, load_backtest_config};
use crate::domain::error::StratbenchError;
use crate::domain::metrics::{PerformanceReport, analyze_performance};
use crate::domain::strategy::CompiledStrategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "stratbench", about = "Rule-based strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for every configured symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
        /// Directory for CSV reports (overrides [backtest] output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the strategy sections of a configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, symbol.as_deref(), output.as_deref())
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = StratbenchError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(e: StratbenchError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

/// Builds and compiles the strategy described by `config`.
pub fn load_strategy(config: &dyn ConfigPort) -> Result<CompiledStrategy, StratbenchError> {
    build_strategy_spec(config)?.compile()
}

/// Result of one symbol's run.
pub struct SymbolRun {
    pub symbol: String,
    pub outcome: Result<(BacktestResult, PerformanceReport), StratbenchError>,
}

fn backtest_symbol(
    data_port: &(dyn DataPort + Sync),
    strategy: &CompiledStrategy,
    bt_config: &BacktestConfig,
    symbol: &str,
) -> Result<(BacktestResult, PerformanceReport), StratbenchError> {
    let bars = data_port.fetch_ohlcv(symbol, bt_config.start_date, bt_config.end_date)?;
    if bars.is_empty() {
        return Err(StratbenchError::NoData {
            symbol: symbol.to_string(),
        });
    }
    let result = backtest_engine::run_backtest(&bars, strategy)?;
    let report = analyze_performance(&result.equity_curve, &result.trades);
    Ok((result, report))
}

/// Runs every symbol independently in parallel. Results keep the order of
/// `bt_config.symbols`.
pub fn backtest_symbols(
    data_port: &(dyn DataPort + Sync),
    strategy: &CompiledStrategy,
    bt_config: &BacktestConfig,
) -> Vec<SymbolRun> {
    bt_config
        .symbols
        .par_iter()
        .map(|symbol| SymbolRun {
            symbol: symbol.clone(),
            outcome: backtest_symbol(data_port, strategy, bt_config, symbol),
        })
        .collect()
}

fn print_summary(symbol: &str, report: &PerformanceReport) {
    let m = &report.metrics;
    let t = &report.trade_stats;
    eprintln!("\n=== {} ===", symbol);
    eprintln!("Total Return:     {:.2}%", m.total_return);
    eprintln!("Annual Return:    {:.2}%", m.annual_return);
    eprintln!("Volatility:       {:.2}%", m.volatility);
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     {:.2}%", m.max_drawdown);
    eprintln!("Calmar Ratio:     {:.2}", m.calmar_ratio);
    eprintln!("Total Trades:     {}", t.total_trades);
    eprintln!("Win Rate:         {:.1}%", t.win_rate);
    eprintln!("Profit Factor:    {:.2}", t.profit_factor);
    eprintln!("Avg Hold Time:    {:.1} days", t.avg_hold_time);
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    output_override: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Some(symbol) = symbol_override {
        bt_config.symbols = vec![symbol.trim().to_uppercase()];
    }

    let strategy = match load_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!(
        "Strategy: {} ({} categories, {} rules, sizing {})",
        strategy.name,
        strategy.categories.len(),
        strategy.rule_count(),
        strategy.sizing.method()
    );
    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        bt_config.symbols.len(),
        bt_config.start_date,
        bt_config.end_date,
    );

    let data_port = CsvAdapter::new(bt_config.data_dir.clone());
    let runs = backtest_symbols(&data_port, &strategy, &bt_config);

    let output_dir = output_override
        .map(Path::to_path_buf)
        .or_else(|| bt_config.output_dir.clone());
    let reporter = CsvReportAdapter;

    let mut succeeded = 0usize;
    let mut first_error: Option<StratbenchError> = None;

    for run in runs {
        match run.outcome {
            Ok((result, report)) => {
                succeeded += 1;
                print_summary(&run.symbol, &report);
                if let Some(dir) = &output_dir {
                    if let Err(e) = reporter.write(&run.symbol, &result, &report, dir) {
                        return fail(e);
                    }
                }
            }
            Err(e) => {
                eprintln!("warning: skipping {} ({})", run.symbol, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match (succeeded, first_error) {
        (0, Some(e)) => {
            eprintln!("error: no symbol could be backtested");
            (&e).into()
        }
        _ => {
            if let Some(dir) = &output_dir {
                eprintln!("\nReports written to: {}", dir.display());
            }
            ExitCode::SUCCESS
        }
    }
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let bt_config = match load_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let strategy = match load_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!("Config validated successfully");

    print_strategy(&strategy);
    eprintln!("\nBacktest:");
    eprintln!("  Symbols:    {}", bt_config.symbols.join(", "));
    eprintln!(
        "  Period:     {} to {}",
        bt_config.start_date, bt_config.end_date
    );
    eprintln!("  Data dir:   {}", bt_config.data_dir.display());
    eprintln!("\nDry run complete, no data loaded.");
    ExitCode::SUCCESS
}

fn print_strategy(strategy: &CompiledStrategy) {
    eprintln!("\nStrategy: {}", strategy.name);
    for category in &strategy.categories {
        eprintln!("  [{}] weight {}", category.name, category.weight);
        if category.rules.is_empty() {
            eprintln!("    (no rules)");
        }
        for (rule, weight) in &category.rules {
            eprintln!("    {} x {}", rule, weight);
        }
    }
    eprintln!("  Sizing: {:?}", strategy.sizing);
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating strategy: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match load_strategy(&adapter) {
        Ok(strategy) => {
            print_strategy(&strategy);
            eprintln!("\nStrategy is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_list_symbols(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let data_dir = match config
        .get_string("backtest", "data_dir")
        .filter(|s| !s.trim().is_empty())
    {
        Some(d) => PathBuf::from(d.trim()),
        None => {
            return fail(StratbenchError::ConfigMissing {
                section: "backtest".to_string(),
                key: "data_dir".to_string(),
            });
        }
    };

    let symbols = match CsvAdapter::new(data_dir.clone()).list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
    }
    ExitCode::SUCCESS
}
