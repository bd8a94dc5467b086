#![allow(dead_code)]

use chrono::NaiveDate;
use rotasim::domain::error::RotasimError;
pub use rotasim::domain::price::{PriceBar, PriceSeries};
use rotasim::ports::data_port::DataPort;
use rotasim::ports::report_port::{ChartOptions, ReportCurve, ReportPort};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn data_series(&self, symbol: &str) -> PriceSeries {
        self.fetch_prices(symbol).unwrap()
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, RotasimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RotasimError::DataSource {
                reason: reason.clone(),
            });
        }
        PriceSeries::new(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

/// Owned copy of one written curve.
#[derive(Debug, Clone)]
pub struct WrittenCurve {
    pub label: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

#[derive(Default)]
pub struct MockReportPort {
    pub written: RefCell<Vec<(PathBuf, bool, Vec<WrittenCurve>)>>,
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        curves: &[ReportCurve<'_>],
        options: &ChartOptions,
        output_path: &Path,
    ) -> Result<(), RotasimError> {
        let curves = curves
            .iter()
            .map(|c| WrittenCurve {
                label: c.label.to_string(),
                dates: c.dates.to_vec(),
                values: c.values.to_vec(),
            })
            .collect();
        self.written
            .borrow_mut()
            .push((output_path.to_path_buf(), options.log_scale, curves));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from 2020-01-01, open equal to close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    bars_from_closes_starting(date(2020, 1, 1), closes)
}

pub fn bars_from_closes_starting(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::new(start + chrono::Duration::days(i as i64), c, c))
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(bars_from_closes(closes)).unwrap()
}

/// Deterministic zig-zag trending series: rising phases broken by sharp dips,
/// so a moving-average rotation triggers several times.
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 * (1.0 + 0.002 * t) + 15.0 * (t / 20.0).sin()
        })
        .collect()
}

pub fn csv_content(bars: &[PriceBar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},1000\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.open.max(b.close),
            b.open.min(b.close),
            b.close
        ));
    }
    out
}
