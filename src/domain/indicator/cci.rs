//! Commodity Channel Index.
//!
//! TP = (H + L + C) / 3
//! CCI = (TP - SMA(TP, n)) / (0.015 * MAD(TP, n))
//! where MAD is the mean absolute deviation of TP from its SMA over the window.
//! Warmup: first (n-1) candles undefined; MAD == 0 is undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::safe_div;

const LAMBERT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(candles: &[Candle], period: usize) -> IndicatorSeries {
    let typical: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    let mut values = vec![None; candles.len()];

    if period > 0 {
        for i in (period - 1)..candles.len() {
            let window = &typical[i + 1 - period..=i];
            let mean = window.iter().sum::<f64>() / period as f64;
            let mad = window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            values[i] = safe_div(typical[i] - mean, LAMBERT_CONSTANT * mad);
        }
    }

    simple_series(IndicatorType::Cci(period), candles, values)
}
