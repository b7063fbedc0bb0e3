//! Shared helpers for indicator calculations.
//!
//! Every helper returns one output per input index and uses `None` for
//! indices that lack enough history or whose arithmetic degenerates.

use crate::domain::candle::Candle;

pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Trailing arithmetic mean over `period` values. A window containing an
/// undefined value is itself undefined.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        out[i] = sum.map(|s| s / period as f64);
    }
    out
}

/// Arithmetic mean. A window of equal values returns that value exactly,
/// free of summation rounding.
pub fn window_mean(window: &[f64]) -> Option<f64> {
    let (&first, rest) = window.split_first()?;
    if rest.iter().all(|&v| v == first) {
        return Some(first);
    }
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Population standard deviation (divides by N). Exactly 0 for a window
/// of equal values.
pub fn population_stddev(window: &[f64]) -> Option<f64> {
    let mean = window_mean(window)?;
    if window.iter().all(|&v| v == mean) {
        return Some(0.0);
    }
    let n = window.len() as f64;
    let variance = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Highest high and lowest low over the `period` candles ending at `end`.
pub fn window_extremes(candles: &[Candle], end: usize, period: usize) -> (f64, f64) {
    let window = &candles[end + 1 - period..=end];
    let highest = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    (highest, lowest)
}

/// Wilder smoothing of `values[first..]`: the first output (at
/// `first + period - 1`) is the simple mean of the first `period` inputs,
/// then `(prev * (period - 1) + x) / period`.
pub fn wilder_smooth(values: &[f64], first: usize, period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < first + period {
        return out;
    }

    let seed_end = first + period - 1;
    let mut smoothed = values[first..=seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end] = Some(smoothed);

    for i in (seed_end + 1)..values.len() {
        smoothed = (smoothed * (period - 1) as f64 + values[i]) / period as f64;
        out[i] = Some(smoothed);
    }
    out
}

/// `numerator / denominator`, undefined when the denominator is zero or the
/// result is not finite.
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let q = numerator / denominator;
    q.is_finite().then_some(q)
}
