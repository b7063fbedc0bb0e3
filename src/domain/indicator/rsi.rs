//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n candles are undefined (need n price changes).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::wilder_smooth;

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut gains = vec![0.0; candles.len()];
    let mut losses = vec![0.0; candles.len()];
    for i in 1..candles.len() {
        let change = candles[i].close - candles[i - 1].close;
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    let avg_gain = wilder_smooth(&gains, 1, period);
    let avg_loss = wilder_smooth(&losses, 1, period);

    let values = avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(gain, loss)| match (*gain, *loss) {
            (Some(gain), Some(loss)) => rsi_from_averages(gain, loss),
            _ => None,
        })
        .collect();

    simple_series(IndicatorType::Rsi(period), candles, values)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
    rsi.is_finite().then(|| rsi.clamp(0.0, 100.0))
}
