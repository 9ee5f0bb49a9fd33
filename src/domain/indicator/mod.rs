//! Rolling-window indicator primitives.
//!
//! Every indicator returns a `Series`: one `Option<f64>` per input bar, where
//! `None` marks a bar without enough defined history. Rolling statistics need
//! a full window of defined inputs, so undefined values propagate forward
//! until they leave the window.

pub mod ema;
pub mod roc;
pub mod stddev;

pub type Series = Vec<Option<f64>>;

/// Lifts a fully defined column into a `Series`.
pub fn defined(values: &[f64]) -> Series {
    values.iter().copied().map(Some).collect()
}

/// Applies `f` to every full window of defined values ending at each bar.
pub fn rolling<F>(values: &[Option<f64>], window: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = Vec::with_capacity(values.len());
    let mut buf: Vec<f64> = Vec::with_capacity(window);

    for i in 0..values.len() {
        if window == 0 || i + 1 < window {
            out.push(None);
            continue;
        }
        buf.clear();
        for v in &values[i + 1 - window..=i] {
            match v {
                Some(x) => buf.push(*x),
                None => break,
            }
        }
        if buf.len() == window {
            out.push(Some(f(&buf)));
        } else {
            out.push(None);
        }
    }

    out
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Series {
    rolling(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

pub fn rolling_max(values: &[Option<f64>], window: usize) -> Series {
    rolling(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

pub fn rolling_min(values: &[Option<f64>], window: usize) -> Series {
    rolling(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Simple moving average of a fully defined column.
pub fn sma(values: &[f64], period: usize) -> Series {
    rolling_mean(&defined(values), period)
}

/// Mean over the defined values only; `None` when nothing is defined.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
