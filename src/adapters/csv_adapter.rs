//! CSV file data adapter.
//!
//! One file per symbol, `<SYMBOL>.csv`, with a
//! `date,open,high,low,close,volume` header and `%Y-%m-%d` dates. The file
//! name is matched case-insensitively. Rows are returned in file order.

use crate::domain::error::StratbenchError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        let exact = self.base_path.join(format!("{}.csv", symbol));
        if exact.is_file() {
            return exact;
        }
        fs::read_dir(&self.base_path)
            .ok()
            .and_then(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .find(|path| {
                        let stem = path.file_stem().map(|s| s.to_string_lossy());
                        path.extension().is_some_and(|ext| ext == "csv")
                            && stem.is_some_and(|s| s.eq_ignore_ascii_case(symbol))
                    })
            })
            .unwrap_or(exact)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, StratbenchError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StratbenchError::NoData {
                symbol: symbol.to_string(),
            },
            _ => StratbenchError::Data {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| StratbenchError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                StratbenchError::Data {
                    reason: format!(
                        "{}: invalid date '{}' on row {}: {}",
                        path.display(),
                        row.date,
                        line + 1,
                        e
                    ),
                }
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(PriceBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        tracing::debug!(symbol, bars = bars.len(), path = %path.display(), "loaded price table");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StratbenchError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StratbenchError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| StratbenchError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let path = entry.path();
            match (path.extension(), path.file_stem()) {
                (Some(ext), Some(stem)) if ext == "csv" => {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
                _ => {}
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
