//! Rolling sample standard deviation.
//!
//! STD(n)[i] = sqrt(sum((x[i-j] - mean)^2 for j in 0..n) / (n - 1))
//! Windows shorter than two observations are undefined.

use crate::domain::indicator::{Series, rolling};

pub fn rolling_std(values: &[Option<f64>], window: usize) -> Series {
    if window < 2 {
        return vec![None; values.len()];
    }

    rolling(values, window, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let variance = w
            .iter()
            .map(|x| {
                let diff = x - mean;
                diff * diff
            })
            .sum::<f64>()
            / (n - 1.0);
        variance.sqrt()
    })
}
