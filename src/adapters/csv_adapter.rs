//! CSV candle adapter.
//!
//! Files carry a `time,open,high,low,close,volume` header with `time` in
//! epoch seconds. One file per symbol, named `<SYMBOL>.csv`.

use crate::domain::candle::{Candle, CandleHistory};
use crate::domain::error::LivefeedError;
use crate::ports::candle_port::CandlePort;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
    max_candles: usize,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf, max_candles: usize) -> Self {
        Self {
            base_path,
            max_candles,
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.csv", symbol.trim().to_uppercase()))
    }
}

impl CandlePort for CsvAdapter {
    fn fetch_candles(&self, symbol: &str) -> Result<Vec<Candle>, LivefeedError> {
        load_candles(&self.csv_path(symbol), self.max_candles)
    }
}

/// Read one candle file, sorted ascending with duplicate timestamps
/// collapsed. Only the newest `max_candles` bars are kept.
pub fn load_candles(path: &Path, max_candles: usize) -> Result<Vec<Candle>, LivefeedError> {
    let content = fs::read_to_string(path).map_err(|e| {
        LivefeedError::data(format!("failed to read {}: {}", path.display(), e))
    })?;

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let mut candles = Vec::new();
    for (idx, result) in rdr.deserialize::<Candle>().enumerate() {
        let candle = result.map_err(|e| {
            LivefeedError::data(format!("{} row {}: {}", path.display(), idx + 1, e))
        })?;
        candles.push(candle);
    }

    let mut history = CandleHistory::new(max_candles);
    history.extend_unordered(candles);
    Ok(history.into_vec())
}
