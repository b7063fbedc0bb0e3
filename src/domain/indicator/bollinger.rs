//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) candles are undefined.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::indicator_helpers::{population_stddev, window_mean};

pub fn calculate_bollinger(candles: &[Candle], period: usize, multiplier: f64) -> IndicatorSeries {
    let mut values = Vec::with_capacity(candles.len());
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    for (i, candle) in candles.iter().enumerate() {
        let bands = if period > 0 && i + 1 >= period {
            let window = &closes[i + 1 - period..=i];
            window_mean(window).zip(population_stddev(window)).map(|(middle, sd)| {
                (middle + multiplier * sd, middle, middle - multiplier * sd)
            })
        } else {
            None
        };

        values.push(IndicatorPoint {
            time: candle.time,
            value: IndicatorValue::Bollinger {
                upper: bands.map(|b| b.0),
                middle: bands.map(|b| b.1),
                lower: bands.map(|b| b.2),
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100: (multiplier * 100.0).round().max(0.0) as u32,
        },
        values,
    }
}
