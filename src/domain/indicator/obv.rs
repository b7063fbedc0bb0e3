//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, simple_series};

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = 0
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; every candle is defined.
pub fn calculate_obv(candles: &[Candle]) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());
    let mut obv: f64 = 0.0;

    for (i, candle) in candles.iter().enumerate() {
        if i > 0 {
            let prev_close = candles[i - 1].close;
            if candle.close > prev_close {
                obv += candle.volume;
            } else if candle.close < prev_close {
                obv -= candle.volume;
            }
        }
        values.push(Some(obv));
    }

    simple_series(IndicatorType::Obv, candles, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, volume: f64) -> Candle {
        Candle {
            time: 0,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }

    #[test]
    fn obv_accumulates_by_direction() {
        let candles = vec![
            candle(10.0, 100.0),
            candle(11.0, 200.0),
            candle(10.5, 50.0),
            candle(10.5, 75.0),
            candle(12.0, 10.0),
        ];
        let series = calculate_obv(&candles);
        assert_eq!(
            series.simple_values(),
            vec![Some(0.0), Some(200.0), Some(150.0), Some(150.0), Some(160.0)]
        );
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&[]).is_empty());
    }

    #[test]
    fn obv_indicator_type() {
        let series = calculate_obv(&[candle(1.0, 1.0)]);
        assert_eq!(series.indicator_type, IndicatorType::Obv);
    }
}
