//! SVG growth chart implementing ReportPort.
//!
//! One polyline per strategy on a shared date axis, yearly gridlines, and an
//! optional base-10 log scale for the invested sum.

use crate::domain::error::RotasimError;
use crate::ports::report_port::{ChartOptions, ReportCurve, ReportPort};
use chrono::{Datelike, NaiveDate};
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 540.0;
const PADDING: f64 = 60.0;
const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Default)]
pub struct SvgChartAdapter;

impl SvgChartAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for SvgChartAdapter {
    fn write(
        &self,
        curves: &[ReportCurve<'_>],
        options: &ChartOptions,
        output_path: &Path,
    ) -> Result<(), RotasimError> {
        let svg = render_chart(curves, options)?;
        fs::write(output_path, svg)?;
        info!("Chart written to {}", output_path.display());
        Ok(())
    }
}

pub fn render_chart(
    curves: &[ReportCurve<'_>],
    options: &ChartOptions,
) -> Result<String, RotasimError> {
    let points = curves.iter().flat_map(|c| c.dates.iter().zip(c.values.iter()));
    let (mut min_date, mut max_date) = (NaiveDate::MAX, NaiveDate::MIN);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for (date, &value) in points {
        if !value.is_finite() {
            continue;
        }
        if options.log_scale && value <= 0.0 {
            return Err(RotasimError::Report {
                reason: format!("log scale cannot show non-positive value {} on {}", value, date),
            });
        }
        let y = scale_value(value, options.log_scale);
        min_date = min_date.min(*date);
        max_date = max_date.max(*date);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if min_date > max_date {
        return Err(RotasimError::Report {
            reason: "no data to chart".to_string(),
        });
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let span_days = (max_date - min_date).num_days().max(1) as f64;
    let range_y = if max_y > min_y { max_y - min_y } else { 1.0 };

    let x_of = |date: NaiveDate| PADDING + (date - min_date).num_days() as f64 / span_days * plot_width;
    let y_of = |y: f64| HEIGHT - PADDING - (y - min_y) / range_y * plot_height;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="sans-serif" font-size="12">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"<text x="{:.0}" y="{:.0}" text-anchor="middle" font-size="16">{}</text>"#,
        WIDTH / 2.0,
        PADDING / 2.0,
        escape(&options.title)
    );

    // yearly gridlines
    for year in (min_date.year() + 1)..=max_date.year() {
        if let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) {
            let x = x_of(jan1);
            let _ = writeln!(
                svg,
                r##"<line x1="{x:.1}" y1="{top:.1}" x2="{x:.1}" y2="{bottom:.1}" stroke="#dddddd"/><text x="{x:.1}" y="{label:.1}" text-anchor="middle">{year}</text>"##,
                top = PADDING,
                bottom = HEIGHT - PADDING,
                label = HEIGHT - PADDING + 16.0,
            );
        }
    }

    for (label_y, text) in y_ticks(min_y, max_y, options.log_scale) {
        let y = y_of(label_y);
        let _ = writeln!(
            svg,
            r##"<line x1="{left:.1}" y1="{y:.1}" x2="{right:.1}" y2="{y:.1}" stroke="#eeeeee"/><text x="{tx:.1}" y="{y:.1}" text-anchor="end">{text}</text>"##,
            left = PADDING,
            right = WIDTH - PADDING,
            tx = PADDING - 6.0,
        );
    }

    let _ = writeln!(
        svg,
        r#"<rect x="{p:.0}" y="{p:.0}" width="{w:.0}" height="{h:.0}" fill="none" stroke="black"/>"#,
        p = PADDING,
        w = plot_width,
        h = plot_height
    );

    for (i, curve) in curves.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let polyline: Vec<String> = curve
            .dates
            .iter()
            .zip(curve.values.iter())
            .filter(|(_, v)| v.is_finite())
            .map(|(d, &v)| format!("{:.1},{:.1}", x_of(*d), y_of(scale_value(v, options.log_scale))))
            .collect();
        let _ = writeln!(
            svg,
            r#"<polyline fill="none" stroke="{}" stroke-width="1.2" points="{}"/>"#,
            color,
            polyline.join(" ")
        );
        let legend_y = PADDING + 16.0 + i as f64 * 16.0;
        let _ = writeln!(
            svg,
            r#"<rect x="{:.1}" y="{:.1}" width="10" height="10" fill="{}"/><text x="{:.1}" y="{:.1}">{}</text>"#,
            PADDING + 10.0,
            legend_y - 9.0,
            color,
            PADDING + 26.0,
            legend_y,
            escape(curve.label)
        );
    }

    svg.push_str("</svg>\n");
    Ok(svg)
}

fn scale_value(value: f64, log_scale: bool) -> f64 {
    if log_scale { value.log10() } else { value }
}

/// Axis labels: powers of ten on a log axis, five even steps otherwise.
fn y_ticks(min_y: f64, max_y: f64, log_scale: bool) -> Vec<(f64, String)> {
    if log_scale {
        let lo = min_y.floor() as i32;
        let hi = max_y.ceil() as i32;
        (lo..=hi)
            .map(|p| p as f64)
            .filter(|&p| p >= min_y && p <= max_y)
            .map(|p| (p, format!("{}", 10f64.powf(p))))
            .collect()
    } else {
        let step = (max_y - min_y) / 4.0;
        if step <= 0.0 {
            return vec![(min_y, format!("{:.2}", min_y))];
        }
        (0..=4)
            .map(|i| {
                let y = min_y + step * i as f64;
                (y, format!("{:.2}", y))
            })
            .collect()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
