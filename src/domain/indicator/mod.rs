//! Technical indicator implementations.
//!
//! Every calculation is a pure function from a candle slice to an
//! [`IndicatorSeries`] holding exactly one [`IndicatorPoint`] per candle,
//! aligned by `time`. Components are `Option<f64>`: `None` marks the warm-up
//! region and any degenerate arithmetic (zero range, zero denominator), so an
//! undefined value is never confused with a real zero.

pub mod acc_dist;
pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volatility;
pub mod williams_r;

pub use acc_dist::calculate_acc_dist;
pub use adx::calculate_adx;
pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use cci::calculate_cci;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use obv::calculate_obv;
pub use roc::calculate_roc;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::calculate_stochastic;
pub use volatility::calculate_historical_volatility;
pub use williams_r::calculate_williams_r;

use std::fmt;
use std::str::FromStr;

use crate::domain::candle::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(Option<f64>),
    Macd {
        line: Option<f64>,
        signal: Option<f64>,
        histogram: Option<f64>,
    },
    Stochastic {
        k: Option<f64>,
        d: Option<f64>,
    },
    Bollinger {
        upper: Option<f64>,
        middle: Option<f64>,
        lower: Option<f64>,
    },
    Adx {
        adx: Option<f64>,
        plus_di: Option<f64>,
        minus_di: Option<f64>,
    },
}

impl IndicatorValue {
    pub fn components(&self) -> Vec<Option<f64>> {
        match *self {
            IndicatorValue::Simple(v) => vec![v],
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => vec![line, signal, histogram],
            IndicatorValue::Stochastic { k, d } => vec![k, d],
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => vec![upper, middle, lower],
            IndicatorValue::Adx {
                adx,
                plus_di,
                minus_di,
            } => vec![adx, plus_di, minus_di],
        }
    }
}

impl IndicatorPoint {
    pub fn simple(time: i64, value: Option<f64>) -> Self {
        Self {
            time,
            value: IndicatorValue::Simple(value),
        }
    }

    /// True when every component of the point is defined.
    pub fn is_valid(&self) -> bool {
        self.value.components().iter().all(Option::is_some)
    }

    pub fn as_simple(&self) -> Option<f64> {
        match self.value {
            IndicatorValue::Simple(v) => v,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Roc(usize),
    Atr(usize),
    Adx(usize),
    Cci(usize),
    WilliamsR(usize),
    HistoricalVolatility(usize),
    Obv,
    AccDist,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        period: usize,
        smooth_k: usize,
        smooth_d: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Single-line view; multi-line indicators yield `None` everywhere.
    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.values.iter().map(IndicatorPoint::as_simple).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn simple_series(
    indicator_type: IndicatorType,
    candles: &[Candle],
    values: Vec<Option<f64>>,
) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: candles
            .iter()
            .zip(values)
            .map(|(c, v)| IndicatorPoint::simple(c.time, v))
            .collect(),
    }
}

/// Compute any indicator by its type descriptor.
pub fn compute(candles: &[Candle], indicator: &IndicatorType) -> IndicatorSeries {
    match *indicator {
        IndicatorType::Sma(n) => calculate_sma(candles, n),
        IndicatorType::Ema(n) => calculate_ema(candles, n),
        IndicatorType::Rsi(n) => calculate_rsi(candles, n),
        IndicatorType::Roc(n) => calculate_roc(candles, n),
        IndicatorType::Atr(n) => calculate_atr(candles, n),
        IndicatorType::Adx(n) => calculate_adx(candles, n),
        IndicatorType::Cci(n) => calculate_cci(candles, n),
        IndicatorType::WilliamsR(n) => calculate_williams_r(candles, n),
        IndicatorType::HistoricalVolatility(n) => calculate_historical_volatility(candles, n),
        IndicatorType::Obv => calculate_obv(candles),
        IndicatorType::AccDist => calculate_acc_dist(candles),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(candles, fast, slow, signal),
        IndicatorType::Stochastic {
            period,
            smooth_k,
            smooth_d,
        } => calculate_stochastic(candles, period, smooth_k, smooth_d),
        IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        } => calculate_bollinger(candles, period, stddev_mult_x100 as f64 / 100.0),
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Roc(period) => write!(f, "ROC({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
            IndicatorType::WilliamsR(period) => write!(f, "WILLR({})", period),
            IndicatorType::HistoricalVolatility(period) => write!(f, "HV({})", period),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::AccDist => write!(f, "ACCDIST"),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic {
                period,
                smooth_k,
                smooth_d,
            } => write!(f, "STOCHASTIC({},{},{})", period, smooth_k, smooth_d),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

impl FromStr for IndicatorType {
    type Err = String;

    /// Parses `name`, `name:p1,p2,...` or the display form `NAME(p1,p2)`,
    /// e.g. `rsi:14`, `macd:12,26,9`, `BOLLINGER(20,2.5)`. Omitted
    /// parameters take the usual defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = match s.split_once(':') {
            Some((name, args)) => (name, args),
            None => s
                .trim()
                .strip_suffix(')')
                .and_then(|body| body.split_once('('))
                .unwrap_or((s, "")),
        };
        let args: Vec<&str> = args
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect();

        let period = |idx: usize, default: usize| -> Result<usize, String> {
            match args.get(idx) {
                Some(raw) => match raw.parse::<usize>() {
                    Ok(0) | Err(_) => Err(format!("invalid period '{raw}' in '{s}'")),
                    Ok(n) => Ok(n),
                },
                None => Ok(default),
            }
        };

        let indicator = match name.trim().to_ascii_lowercase().as_str() {
            "sma" => IndicatorType::Sma(period(0, 20)?),
            "ema" => IndicatorType::Ema(period(0, 20)?),
            "rsi" => IndicatorType::Rsi(period(0, 14)?),
            "roc" => IndicatorType::Roc(period(0, 12)?),
            "atr" => IndicatorType::Atr(period(0, 14)?),
            "adx" => IndicatorType::Adx(period(0, 14)?),
            "cci" => IndicatorType::Cci(period(0, 20)?),
            "willr" | "williams_r" => IndicatorType::WilliamsR(period(0, 14)?),
            "hv" | "volatility" => IndicatorType::HistoricalVolatility(period(0, 20)?),
            "obv" => IndicatorType::Obv,
            "accdist" | "ad" => IndicatorType::AccDist,
            "macd" => IndicatorType::Macd {
                fast: period(0, macd::DEFAULT_FAST)?,
                slow: period(1, macd::DEFAULT_SLOW)?,
                signal: period(2, macd::DEFAULT_SIGNAL)?,
            },
            "stochastic" | "stoch" => IndicatorType::Stochastic {
                period: period(0, 14)?,
                smooth_k: period(1, 3)?,
                smooth_d: period(2, 3)?,
            },
            "bollinger" | "bb" => {
                let mult = match args.get(1) {
                    Some(raw) => raw
                        .parse::<f64>()
                        .ok()
                        .filter(|m| m.is_finite() && *m >= 0.0)
                        .ok_or_else(|| format!("invalid multiplier '{raw}' in '{s}'"))?,
                    None => 2.0,
                };
                IndicatorType::Bollinger {
                    period: period(0, 20)?,
                    stddev_mult_x100: (mult * 100.0).round() as u32,
                }
            }
            other => return Err(format!("unknown indicator '{other}'")),
        };
        Ok(indicator)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::candles_from_closes;
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2)");
    }

    #[test]
    fn parse_with_params() {
        assert_eq!("rsi:7".parse::<IndicatorType>(), Ok(IndicatorType::Rsi(7)));
        assert_eq!(
            "MACD:5,10,3".parse::<IndicatorType>(),
            Ok(IndicatorType::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            })
        );
        assert_eq!(
            "bollinger:20,2.5".parse::<IndicatorType>(),
            Ok(IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 250
            })
        );
    }

    #[test]
    fn parse_defaults() {
        assert_eq!(
            "stoch".parse::<IndicatorType>(),
            Ok(IndicatorType::Stochastic {
                period: 14,
                smooth_k: 3,
                smooth_d: 3
            })
        );
        assert_eq!("obv".parse::<IndicatorType>(), Ok(IndicatorType::Obv));
        assert_eq!(
            "macd".parse::<IndicatorType>(),
            Ok(IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            })
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("sma:0".parse::<IndicatorType>().is_err());
        assert!("sma:abc".parse::<IndicatorType>().is_err());
        assert!("vwap".parse::<IndicatorType>().is_err());
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "sma20");
        map.insert(IndicatorType::Obv, "obv");

        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorType::Sma(50)), None);
    }

    #[test]
    fn compute_aligns_every_indicator_to_input() {
        let candles = candles_from_closes(&[10.0, 11.0, 12.0, 11.5, 13.0, 12.5, 14.0, 15.0]);
        let kinds = [
            "sma:3", "ema:3", "rsi:3", "roc:2", "atr:3", "adx:2", "cci:3", "willr:3", "hv:3",
            "obv", "accdist", "macd:2,4,2", "stoch:3,2,2", "bollinger:3,2",
        ];
        for kind in kinds {
            let indicator: IndicatorType = kind.parse().unwrap();
            let series = compute(&candles, &indicator);
            assert_eq!(series.len(), candles.len(), "{kind}");
            assert_eq!(series.indicator_type, indicator);
            for (point, candle) in series.values.iter().zip(&candles) {
                assert_eq!(point.time, candle.time);
            }
        }
    }

    #[test]
    fn point_validity_requires_all_components() {
        let point = IndicatorPoint {
            time: 0,
            value: IndicatorValue::Stochastic {
                k: Some(50.0),
                d: None,
            },
        };
        assert!(!point.is_valid());
        assert_eq!(point.as_simple(), None);
    }
}
