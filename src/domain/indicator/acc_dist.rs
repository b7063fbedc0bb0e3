//! Accumulation/Distribution line.
//!
//! MFM = ((C - L) - (H - C)) / (H - L), with a zero range treated as a
//! denominator of 1. AD is the running sum of MFM * V. No warmup.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};

pub fn calculate_acc_dist(candles: &[Candle]) -> IndicatorSeries {
    let mut total = 0.0;
    let values = candles
        .iter()
        .map(|c| {
            let range = c.high - c.low;
            let denominator = if range == 0.0 { 1.0 } else { range };
            let mfm = ((c.close - c.low) - (c.high - c.close)) / denominator;
            total += mfm * c.volume;
            total.is_finite().then_some(total)
        })
        .collect();

    simple_series(IndicatorType::AccDist, candles, values)
}
