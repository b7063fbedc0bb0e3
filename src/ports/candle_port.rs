//! Historical candle source port.

use crate::domain::candle::Candle;
use crate::domain::error::LivefeedError;

pub trait CandlePort {
    /// Candles for `symbol` ordered ascending by time, without duplicates.
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<Candle>, LivefeedError>;
}
