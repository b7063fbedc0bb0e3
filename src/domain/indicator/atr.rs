//! Average True Range (Wilder).
//!
//! TR[0] = H - L, TR[i] = max(H-L, |H-prevC|, |L-prevC|).
//! Seed at index n-1 is the mean of the first n TRs, then Wilder smoothing.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::wilder_smooth;

pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    simple_series(
        IndicatorType::Atr(period),
        candles,
        wilder_smooth(&true_ranges(candles), 0, period),
    )
}

pub(crate) fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if i == 0 {
                candle.high - candle.low
            } else {
                candle.true_range(candles[i - 1].close)
            }
        })
        .collect()
}
