//! Marketstack end-of-day data adapter.
//!
//! Pages through `/v1/eod` in ascending date order until the reported total
//! is reached.

use crate::adapters::csv_adapter::parse_date;
use crate::domain::config_validation::read_page_size;
use crate::domain::error::RotasimError;
use crate::domain::price::{PriceBar, PriceSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use log::info;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.marketstack.com/v1/eod";

#[derive(Debug, Deserialize)]
pub struct EodPage {
    pub pagination: Pagination,
    #[serde(default)]
    pub data: Vec<EodRecord>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EodRecord {
    pub date: String,
    pub open: f64,
    pub close: f64,
}

pub struct MarketstackAdapter {
    client: reqwest::blocking::Client,
    api_key: String,
    page_size: usize,
}

impl MarketstackAdapter {
    pub fn new(api_key: String, page_size: usize) -> Result<Self, RotasimError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| data_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            page_size: page_size.max(1),
        })
    }

    /// Reads `[marketstack] api_key` and `page_size`.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RotasimError> {
        let api_key = config
            .get_string("marketstack", "api_key")
            .ok_or_else(|| RotasimError::ConfigMissing {
                section: "marketstack".to_string(),
                key: "api_key".to_string(),
            })?;
        Self::new(api_key, read_page_size(config)?)
    }

    fn page_url(&self, symbol: &str, offset: usize) -> String {
        format!(
            "{BASE_URL}?access_key={}&symbols={symbol}&sort=ASC&offset={offset}&limit={}",
            self.api_key, self.page_size
        )
    }

    fn fetch_page(&self, symbol: &str, offset: usize) -> Result<EodPage, RotasimError> {
        info!(
            "Downloading {} bars {} to {}",
            symbol,
            offset,
            offset + self.page_size
        );
        let resp = self
            .client
            .get(self.page_url(symbol, offset))
            .send()
            .map_err(|e| data_error(format!("request for {} failed: {}", symbol, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(data_error(format!("HTTP {} for {}", status, symbol)));
        }

        resp.json()
            .map_err(|e| data_error(format!("failed to parse response for {}: {}", symbol, e)))
    }
}

impl DataPort for MarketstackAdapter {
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, RotasimError> {
        let records = paginate(self.page_size, |offset| self.fetch_page(symbol, offset))?;
        let series = records_to_series(records)?;
        info!(
            "Downloaded {} bars for {} ({} to {})",
            series.len(),
            symbol,
            series.first_date(),
            series.last_date()
        );
        Ok(series)
    }
}

/// Collects pages from `fetch_page(offset)` until the offset reaches the
/// reported total or a page comes back empty.
pub fn paginate<F>(page_size: usize, mut fetch_page: F) -> Result<Vec<EodRecord>, RotasimError>
where
    F: FnMut(usize) -> Result<EodPage, RotasimError>,
{
    let page_size = page_size.max(1);
    let mut offset = 0;
    let mut records = Vec::new();

    loop {
        let page = fetch_page(offset)?;
        if page.data.is_empty() {
            break;
        }
        records.extend(page.data);
        offset += page_size;
        if offset >= page.pagination.total {
            break;
        }
    }

    Ok(records)
}

pub fn records_to_series(records: Vec<EodRecord>) -> Result<PriceSeries, RotasimError> {
    let mut bars = Vec::with_capacity(records.len());
    for record in records {
        let date = parse_date(&record.date).map_err(data_error)?;
        bars.push(PriceBar::new(date, record.open, record.close));
    }
    bars.sort_by_key(|b| b.date);
    PriceSeries::new(bars)
}

fn data_error(reason: String) -> RotasimError {
    RotasimError::DataSource { reason }
}
