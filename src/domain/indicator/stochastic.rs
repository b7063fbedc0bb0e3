//! Stochastic oscillator.
//!
//! raw %K = (C - LL(n)) / (HH(n) - LL(n)) * 100
//! %K = SMA(smooth_k) of raw %K
//! %D = SMA(smooth_d) of %K
//!
//! A zero high-low range leaves raw %K undefined for that candle, which in
//! turn leaves every smoothing window that contains it undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::indicator_helpers::{rolling_mean, safe_div, window_extremes};

pub fn calculate_stochastic(
    candles: &[Candle],
    period: usize,
    smooth_k: usize,
    smooth_d: usize,
) -> IndicatorSeries {
    let mut raw_k = vec![None; candles.len()];
    if period > 0 {
        for i in (period - 1)..candles.len() {
            let (highest, lowest) = window_extremes(candles, i, period);
            raw_k[i] = safe_div(candles[i].close - lowest, highest - lowest).map(|v| v * 100.0);
        }
    }

    let k = rolling_mean(&raw_k, smooth_k);
    let d = rolling_mean(&k, smooth_d);

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| IndicatorPoint {
            time: candle.time,
            value: IndicatorValue::Stochastic { k: k[i], d: d[i] },
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stochastic {
            period,
            smooth_k,
            smooth_d,
        },
        values,
    }
}
