//! Williams %R.
//!
//! %R = (HH(n) - C) / (HH(n) - LL(n)) * -100, in [-100, 0].
//! Warmup: first (n-1) candles undefined; a zero range is undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};
use crate::domain::indicator_helpers::{safe_div, window_extremes};

pub fn calculate_williams_r(candles: &[Candle], period: usize) -> IndicatorSeries {
    let mut values = vec![None; candles.len()];
    if period > 0 {
        for i in (period - 1)..candles.len() {
            let (highest, lowest) = window_extremes(candles, i, period);
            values[i] = safe_div(highest - candles[i].close, highest - lowest).map(|v| v * -100.0);
        }
    }
    simple_series(IndicatorType::WilliamsR(period), candles, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::hlc;

    #[test]
    fn williams_r_known_value() {
        let candles = hlc(&[(10.0, 5.0, 8.0), (12.0, 6.0, 11.0), (11.0, 7.0, 9.0)]);
        let series = calculate_williams_r(&candles, 3);
        // (12 - 9) / (12 - 5) * -100
        let expected = -300.0 / 7.0;
        assert!((series.values[2].as_simple().unwrap() - expected).abs() < 1e-10);
        assert_eq!(series.values[1].as_simple(), None);
    }

    #[test]
    fn williams_r_close_at_high_is_zero() {
        let candles = hlc(&[(10.0, 5.0, 7.0), (12.0, 6.0, 12.0)]);
        let series = calculate_williams_r(&candles, 2);
        assert_eq!(series.values[1].as_simple(), Some(-0.0));
    }

    #[test]
    fn williams_r_zero_range_is_undefined() {
        let candles = hlc(&[(5.0, 5.0, 5.0); 3]);
        let series = calculate_williams_r(&candles, 2);
        assert_eq!(series.simple_values(), vec![None, None, None]);
    }
}
