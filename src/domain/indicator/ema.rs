//! Exponential Moving Average.
//!
//! alpha = 2/(span+1), EMA[0] = C[0], then EMA[i] = C[i]*alpha + EMA[i-1]*(1-alpha).
//! No warm-up bias correction, so every bar is defined.

use crate::domain::indicator::Series;

pub fn calculate_ema(closes: &[f64], span: usize) -> Series {
    if span == 0 {
        return vec![None; closes.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut values = Vec::with_capacity(closes.len());
    let mut ema = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        ema = if i == 0 {
            close
        } else {
            close * alpha + ema * (1.0 - alpha)
        };
        values.push(Some(ema));
    }

    values
}
