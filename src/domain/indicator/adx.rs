//! ADX (Average Directional Index).
//!
//! 1. +DM / -DM from consecutive highs and lows; only the larger positive
//!    move counts, the other side is 0
//! 2. Wilder-smooth +DM, -DM and True Range over n (first value at index n)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = rolling mean of DX over n (first value at index 2n-1)
//!
//! A zero smoothed TR or a zero DI sum leaves the point undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::atr::true_ranges;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::indicator_helpers::{rolling_mean, safe_div, wilder_smooth};

pub fn calculate_adx(candles: &[Candle], period: usize) -> IndicatorSeries {
    let len = candles.len();
    let mut plus_dm = vec![0.0; len];
    let mut minus_dm = vec![0.0; len];
    for i in 1..len {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let tr = true_ranges(candles);
    let smoothed_tr = wilder_smooth(&tr, 1, period);
    let smoothed_plus = wilder_smooth(&plus_dm, 1, period);
    let smoothed_minus = wilder_smooth(&minus_dm, 1, period);

    let mut plus_di = vec![None; len];
    let mut minus_di = vec![None; len];
    let mut dx = vec![None; len];
    for i in 0..len {
        let (Some(tr), Some(p), Some(m)) = (smoothed_tr[i], smoothed_plus[i], smoothed_minus[i])
        else {
            continue;
        };
        plus_di[i] = safe_div(p, tr).map(|v| v * 100.0);
        minus_di[i] = safe_div(m, tr).map(|v| v * 100.0);
        if let (Some(p), Some(m)) = (plus_di[i], minus_di[i]) {
            dx[i] = safe_div((p - m).abs(), p + m).map(|v| v * 100.0);
        }
    }

    let adx = rolling_mean(&dx, period);

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| IndicatorPoint {
            time: candle.time,
            value: IndicatorValue::Adx {
                adx: adx[i],
                plus_di: plus_di[i],
                minus_di: minus_di[i],
            },
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Adx(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::hlc;

    fn adx_parts(point: &IndicatorPoint) -> (Option<f64>, Option<f64>, Option<f64>) {
        match point.value {
            IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            } => (adx, plus_di, minus_di),
            ref other => panic!("Expected Adx value, got {:?}", other),
        }
    }

    fn uptrend(n: usize) -> Vec<Candle> {
        let rows: Vec<(f64, f64, f64)> = (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                (c + 1.0, c - 1.0, c)
            })
            .collect();
        hlc(&rows)
    }

    #[test]
    fn adx_steady_uptrend_is_maximal() {
        let series = calculate_adx(&uptrend(12), 3);
        let (adx, plus_di, minus_di) = adx_parts(&series.values[11]);

        // +DM = 1, TR = 2 each step
        assert!((plus_di.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(minus_di, Some(0.0));
        assert!((adx.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn adx_warmup_regions() {
        let series = calculate_adx(&uptrend(12), 3);

        let (adx, plus_di, _) = adx_parts(&series.values[2]);
        assert!(adx.is_none() && plus_di.is_none());

        let (adx, plus_di, _) = adx_parts(&series.values[3]);
        assert!(adx.is_none() && plus_di.is_some());

        assert!(!series.values[4].is_valid());
        assert!(series.values[5].is_valid());
    }

    #[test]
    fn adx_bounded() {
        let rows: Vec<(f64, f64, f64)> = (0..60)
            .map(|i| {
                let c = 100.0 + ((i * 13) % 17) as f64 - 8.0;
                (c + 2.0, c - 1.5, c)
            })
            .collect();
        let series = calculate_adx(&hlc(&rows), 5);
        for point in series.values.iter().filter(|p| p.is_valid()) {
            let (adx, _, _) = adx_parts(point);
            assert!((0.0..=100.0).contains(&adx.unwrap()));
        }
    }

    #[test]
    fn adx_flat_series_is_undefined() {
        let series = calculate_adx(&hlc(&[(10.0, 10.0, 10.0); 10]), 2);
        assert!(series.values.iter().all(|p| !p.is_valid()));
    }
}
