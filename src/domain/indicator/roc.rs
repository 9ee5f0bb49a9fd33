//! Percent change over n bars.
//!
//! PCT(n)[i] = C[i] / C[i-n] - 1
//! Undefined for the first n bars and whenever C[i-n] == 0.

use crate::domain::indicator::Series;

pub fn pct_change(values: &[f64], periods: usize) -> Series {
    let mut out = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if periods == 0 || i < periods {
            out.push(None);
            continue;
        }
        let prev = values[i - periods];
        if prev == 0.0 {
            out.push(None);
        } else {
            out.push(Some(values[i] / prev - 1.0));
        }
    }

    out
}

/// Rate of change in percent: pct_change * 100.
pub fn calculate_roc(closes: &[f64], period: usize) -> Series {
    pct_change(closes, period)
        .into_iter()
        .map(|v| v.map(|r| r * 100.0))
        .collect()
}
