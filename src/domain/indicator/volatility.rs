//! Historical volatility.
//!
//! r[i] = ln(C[i] / C[i-1]); HV(n)[i] = stddev(r[i-n+1..=i]) * sqrt(365) * 100,
//! using the population standard deviation. Warmup: first n candles
//! undefined. Windows touching a non-positive close are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::population_stddev;

const PERIODS_PER_YEAR: f64 = 365.0;

pub fn calculate_historical_volatility(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut returns: Vec<Option<f64>> = vec![None; candles.len()];
    for i in 1..candles.len() {
        let (prev, curr) = (candles[i - 1].close, candles[i].close);
        if prev > 0.0 && curr > 0.0 {
            returns[i] = Some((curr / prev).ln());
        }
    }

    let mut values = vec![None; candles.len()];
    if period > 0 {
        for i in period..candles.len() {
            let window: Option<Vec<f64>> = returns[i + 1 - period..=i].iter().copied().collect();
            values[i] = window
                .as_deref()
                .and_then(population_stddev)
                .map(|sd| sd * PERIODS_PER_YEAR.sqrt() * 100.0);
        }
    }

    simple_series(IndicatorType::HistoricalVolatility(period), candles, values)
}
