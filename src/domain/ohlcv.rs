//! Daily price bar representation and price-table checks.

use chrono::NaiveDate;

use crate::domain::error::StratbenchError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// close / prev_close - 1, undefined when the previous close is zero.
    pub fn simple_return(&self, prev_close: f64) -> Option<f64> {
        if prev_close == 0.0 {
            None
        } else {
            Some(self.close / prev_close - 1.0)
        }
    }

    /// ln(close / prev_close), undefined unless both closes are positive.
    pub fn log_return(&self, prev_close: f64) -> Option<f64> {
        if prev_close > 0.0 && self.close > 0.0 {
            Some((self.close / prev_close).ln())
        } else {
            None
        }
    }
}

/// Rejects empty tables, non-increasing dates and non-finite prices.
pub fn validate_price_table(bars: &[PriceBar]) -> Result<(), StratbenchError> {
    if bars.is_empty() {
        return Err(StratbenchError::EmptyPriceTable);
    }

    for (row, bar) in bars.iter().enumerate() {
        let fields = [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StratbenchError::MalformedPriceTable {
                row,
                reason: format!("{name} is not a finite number"),
            });
        }
        if row > 0 && bar.date <= bars[row - 1].date {
            return Err(StratbenchError::MalformedPriceTable {
                row,
                reason: format!(
                    "date {} does not follow {}",
                    bar.date,
                    bars[row - 1].date
                ),
            });
        }
    }

    Ok(())
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
