//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]).
//! Warmup: first (n-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::rolling_mean;

pub fn calculate_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    let closes: Vec<Option<f64>> = candles.iter().map(|c| Some(c.close)).collect();
    simple_series(
        IndicatorType::Sma(period),
        candles,
        rolling_mean(&closes, period),
    )
}
