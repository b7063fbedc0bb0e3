//! ROC (Rate of Change) indicator implementation.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: undefined
//! Warmup: first n candles undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::safe_div;

pub fn calculate_roc(candles: &[Candle], period: usize) -> IndicatorSeries {
    let values = (0..candles.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            let prev_close = candles[i - period].close;
            safe_div(candles[i].close - prev_close, prev_close).map(|v| v * 100.0)
        })
        .collect();

    simple_series(IndicatorType::Roc(period), candles, values)
}
