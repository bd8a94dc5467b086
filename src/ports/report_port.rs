//! Report output port trait.

use crate::domain::error::RotasimError;
use chrono::NaiveDate;
use std::path::Path;

/// One labelled invested-sum curve.
#[derive(Debug, Clone, Copy)]
pub struct ReportCurve<'a> {
    pub label: &'a str,
    pub dates: &'a [NaiveDate],
    pub values: &'a [f64],
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: String,
    pub log_scale: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: "Different strategies over time".to_string(),
            log_scale: true,
        }
    }
}

/// Port for rendering strategy curves.
pub trait ReportPort {
    fn write(
        &self,
        curves: &[ReportCurve<'_>],
        options: &ChartOptions,
        output_path: &Path,
    ) -> Result<(), RotasimError>;
}
