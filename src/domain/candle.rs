//! OHLCV candle representation and the bounded history buffer.
//!
//! Candles are ordered ascending by `time` (seconds). A history buffer never
//! holds two candles with the same timestamp: a repeated timestamp replaces the
//! last entry, which is how a still-forming bar is updated in place.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::LivefeedError;
use crate::domain::message::parse_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Outcome of [`CandleHistory::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Appended,
    Replaced,
    /// The candle is older than the newest bar and was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct CandleHistory {
    candles: Vec<Candle>,
    capacity: usize,
}

impl CandleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            candles: Vec::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    pub fn upsert(&mut self, candle: Candle) -> Upsert {
        let outcome = match self.candles.last_mut() {
            Some(last) if last.time == candle.time => {
                *last = candle;
                Upsert::Replaced
            }
            Some(last) if last.time > candle.time => Upsert::Stale,
            _ => {
                self.candles.push(candle);
                Upsert::Appended
            }
        };

        if self.candles.len() > self.capacity {
            let excess = self.candles.len() - self.capacity;
            self.candles.drain(..excess);
        }
        outcome
    }

    /// Insert a batch in any order; the result is sorted and de-duplicated,
    /// later duplicates winning.
    pub fn extend_unordered(&mut self, candles: impl IntoIterator<Item = Candle>) {
        let mut incoming: Vec<Candle> = candles.into_iter().collect();
        incoming.sort_by_key(|c| c.time);
        for candle in incoming {
            self.upsert(candle);
        }
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candle> {
        self.candles
    }
}

/// Convert the REST kline seed (`[[openTimeMs, open, high, low, close, volume, ...], ...]`)
/// into candles keyed by seconds.
pub fn parse_kline_rows(rows: &Value) -> Result<Vec<Candle>, LivefeedError> {
    let rows = rows
        .as_array()
        .ok_or_else(|| LivefeedError::data("kline seed must be an array"))?;

    let mut history = CandleHistory::new(rows.len().max(1));
    let mut parsed = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        parsed.push(parse_kline_row(row).map_err(|reason| {
            LivefeedError::data(format!("kline row {idx}: {reason}"))
        })?);
    }
    history.extend_unordered(parsed);
    Ok(history.into_vec())
}

fn parse_kline_row(row: &Value) -> Result<Candle, String> {
    let fields = row.as_array().ok_or("row is not an array")?;
    if fields.len() < 6 {
        return Err(format!("expected at least 6 fields, got {}", fields.len()));
    }
    let open_time_ms = fields[0].as_i64().ok_or("open time is not an integer")?;
    let field = |i: usize, name: &str| {
        parse_decimal(&fields[i]).ok_or_else(|| format!("invalid {name} value"))
    };

    Ok(Candle {
        time: open_time_ms.div_euclid(1000),
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}
