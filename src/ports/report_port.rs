//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::StratbenchError;
use crate::domain::metrics::PerformanceReport;

/// Port for writing per-symbol backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        symbol: &str,
        result: &BacktestResult,
        report: &PerformanceReport,
        output_dir: &Path,
    ) -> Result<(), StratbenchError>;
}
