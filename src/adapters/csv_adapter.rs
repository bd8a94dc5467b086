//! CSV file data adapter.
//!
//! Reads `<base_path>/<symbol>.csv`. Columns are located by header name, so
//! raw API dumps with extra columns (volume, adjusted prices, exchange) load
//! as-is.

use crate::domain::error::RotasimError;
use crate::domain::price::{PriceBar, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
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
        self.base_path.join(format!("{}.csv", symbol))
    }

    pub fn parse(content: &str) -> Result<PriceSeries, RotasimError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error: {}", e)))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| data_error(format!("missing {} column", name)))
        };
        let date_col = column("date")?;
        let open_col = column("open")?;
        let close_col = column("close")?;

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let field = |col: usize, name: &str| {
                record
                    .get(col)
                    .ok_or_else(|| data_error(format!("row {}: missing {} value", row + 1, name)))
            };

            let date = parse_date(field(date_col, "date")?)
                .map_err(|reason| data_error(format!("row {}: {}", row + 1, reason)))?;
            let open = parse_price(field(open_col, "open")?, "open", row)?;
            let close = parse_price(field(close_col, "close")?, "close", row)?;

            bars.push(PriceBar::new(date, open, close));
        }

        bars.sort_by_key(|b| b.date);
        PriceSeries::new(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, RotasimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;
        let series = Self::parse(&content)?;
        info!(
            "Loaded {} bars for {} ({} to {})",
            series.len(),
            symbol,
            series.first_date(),
            series.last_date()
        );
        Ok(series)
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339, and `YYYY-MM-DDTHH:MM:SS+hhmm`.
/// Timestamps are normalized to their UTC calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Ok(dt.with_timezone(&Utc).date_naive());
        }
    }
    Err(format!("invalid date '{}'", raw))
}

fn parse_price(raw: &str, name: &str, row: usize) -> Result<f64, RotasimError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| data_error(format!("row {}: invalid {} value: {}", row + 1, name, e)))
}

fn data_error(reason: String) -> RotasimError {
    RotasimError::DataSource { reason }
}
