//! CSV report adapter implementing ReportPort.
//!
//! Writes three files per symbol into the output directory:
//! `<symbol>_trades.csv`, `<symbol>_equity.csv` and `<symbol>_summary.csv`.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratbenchError;
use crate::domain::metrics::PerformanceReport;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

#[derive(Serialize)]
struct TradeRow {
    date: String,
    direction: String,
    fill_price: f64,
    size: f64,
    resulting_position: f64,
    realized_pnl: f64,
    hold_time_days: i64,
}

#[derive(Serialize)]
struct EquityRow {
    date: String,
    equity: f64,
    /// Empty when no exposure decision was made for the bar.
    position: Option<f64>,
    drawdown: f64,
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    metric: &'a str,
    value: f64,
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> StratbenchError {
    StratbenchError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), StratbenchError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| report_err(path, e))?;
    }
    writer.flush().map_err(|e| report_err(path, e))?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        symbol: &str,
        result: &BacktestResult,
        report: &PerformanceReport,
        output_dir: &Path,
    ) -> Result<(), StratbenchError> {
        fs::create_dir_all(output_dir)?;
        let stem = symbol.to_lowercase();

        let trades_path = output_dir.join(format!("{stem}_trades.csv"));
        write_rows(
            &trades_path,
            result.trades.iter().map(|t| TradeRow {
                date: t.date.format("%Y-%m-%d").to_string(),
                direction: t.direction.to_string(),
                fill_price: t.fill_price,
                size: t.size,
                resulting_position: t.resulting_position,
                realized_pnl: t.realized_pnl,
                hold_time_days: t.hold_time_days,
            }),
        )?;

        let equity_path = output_dir.join(format!("{stem}_equity.csv"));
        write_rows(
            &equity_path,
            result
                .equity_curve
                .iter()
                .zip(&result.positions)
                .zip(&report.drawdowns)
                .map(|((point, position), dd)| EquityRow {
                    date: point.date.format("%Y-%m-%d").to_string(),
                    equity: point.equity,
                    position: *position,
                    drawdown: dd.drawdown,
                }),
        )?;

        let summary_path = output_dir.join(format!("{stem}_summary.csv"));
        write_rows(
            &summary_path,
            report
                .summary_rows()
                .into_iter()
                .map(|(metric, value)| SummaryRow { metric, value }),
        )?;

        tracing::info!(symbol, dir = %output_dir.display(), "reports written");
        Ok(())
    }
}
