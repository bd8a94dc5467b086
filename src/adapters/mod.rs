//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "marketstack")]
pub mod marketstack_adapter;
pub mod svg_chart_adapter;
