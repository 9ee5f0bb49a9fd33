//! Data access port trait.

use crate::domain::error::StratbenchError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` within `[start_date, end_date]`, ascending by date.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, StratbenchError>;

    fn list_symbols(&self) -> Result<Vec<String>, StratbenchError>;
}
