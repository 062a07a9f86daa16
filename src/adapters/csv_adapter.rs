//! CSV candle adapter.
//!
//! One file per symbol, `{dir}/{symbol}.csv`, with a header row and columns
//! `timestamp,open,high,low,close,volume`. The timestamp is either epoch
//! milliseconds or RFC 3339.

use crate::domain::candle::Candle;
use crate::domain::error::TraderError;
use crate::ports::data_port::CandleSource;
use chrono::DateTime;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn field(record: &csv::StringRecord, index: usize, name: &str, symbol: &str) -> Result<f64, TraderError> {
    let raw = record.get(index).ok_or_else(|| TraderError::InvalidData {
        symbol: symbol.to_string(),
        reason: format!("missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| TraderError::InvalidData {
        symbol: symbol.to_string(),
        reason: format!("invalid {name} value '{raw}': {e}"),
    })
}

impl CandleSource for CsvAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>, TraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TraderError::NoData {
                    symbol: symbol.to_string(),
                }
            } else {
                TraderError::Io(e)
            }
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TraderError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {e}"),
            })?;

            let raw_ts = record.get(0).ok_or_else(|| TraderError::InvalidData {
                symbol: symbol.to_string(),
                reason: "missing timestamp column".into(),
            })?;
            let timestamp_ms = parse_timestamp(raw_ts).ok_or_else(|| TraderError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("invalid timestamp '{raw_ts}'"),
            })?;

            if timestamp_ms < start_ms || timestamp_ms > end_ms {
                continue;
            }

            candles.push(Candle {
                symbol: symbol.to_string(),
                timestamp_ms,
                open: field(&record, 1, "open", symbol)?,
                high: field(&record, 2, "high", symbol)?,
                low: field(&record, 3, "low", symbol)?,
                close: field(&record, 4, "close", symbol)?,
                volume: field(&record, 5, "volume", symbol)?,
            });
        }

        candles.sort_by_key(|c| c.timestamp_ms);
        Ok(candles)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TraderError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
