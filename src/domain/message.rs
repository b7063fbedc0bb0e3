//! Inbound wire payloads for the combined-stream endpoint.
//!
//! Frames arrive as `{ "stream": "...", "data": { ... } }`. Only `data` is
//! handed to subscribers; the typed views below are for consumers that want
//! kline or ticker fields without walking the JSON themselves.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::candle::Candle;
use crate::domain::error::LivefeedError;

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    /// The dispatchable payload, if the frame carries one.
    pub fn payload(&self) -> Option<&Value> {
        self.data.as_ref().filter(|d| !d.is_null())
    }
}

pub fn parse_envelope(text: &str) -> Result<Envelope, LivefeedError> {
    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(LivefeedError::payload("frame is not a JSON object"));
    }
    Ok(serde_json::from_value(value)?)
}

/// Exchange decimals come as strings ("42000.10") but tolerate plain numbers.
pub(crate) fn parse_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn decimal(obj: &Value, key: &str) -> Result<f64, LivefeedError> {
    obj.get(key)
        .and_then(parse_decimal)
        .ok_or_else(|| LivefeedError::payload(format!("missing or invalid field '{key}'")))
}

#[derive(Debug, Clone, PartialEq)]
pub struct KlineEvent {
    pub symbol: String,
    pub interval: String,
    pub open_time_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_closed: bool,
}

impl KlineEvent {
    pub fn from_data(data: &Value) -> Result<Self, LivefeedError> {
        let k = data
            .get("k")
            .filter(|k| k.is_object())
            .ok_or_else(|| LivefeedError::payload("kline payload has no 'k' object"))?;

        let open_time_ms = k
            .get("t")
            .and_then(Value::as_i64)
            .ok_or_else(|| LivefeedError::payload("missing or invalid field 't'"))?;

        Ok(Self {
            symbol: data
                .get("s")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            interval: k
                .get("i")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            open_time_ms,
            open: decimal(k, "o")?,
            high: decimal(k, "h")?,
            low: decimal(k, "l")?,
            close: decimal(k, "c")?,
            volume: k.get("v").and_then(parse_decimal).unwrap_or(0.0),
            is_closed: k.get("x").and_then(Value::as_bool).unwrap_or(false),
        })
    }

    pub fn to_candle(&self) -> Candle {
        Candle {
            time: self.open_time_ms.div_euclid(1000),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerEvent {
    pub symbol: String,
    pub last_price: f64,
    pub price_change_percent: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
}

impl TickerEvent {
    pub fn from_data(data: &Value) -> Result<Self, LivefeedError> {
        let symbol = data
            .get("s")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LivefeedError::payload("ticker payload has no symbol"))?;

        Ok(Self {
            symbol: symbol.to_uppercase(),
            last_price: decimal(data, "c")?,
            price_change_percent: data.get("P").and_then(parse_decimal),
            high: data.get("h").and_then(parse_decimal),
            low: data.get("l").and_then(parse_decimal),
            volume: data.get("v").and_then(parse_decimal),
        })
    }
}
