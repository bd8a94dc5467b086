//! Core domain types and logic.

pub mod price;
pub mod indicator;
pub mod fees;
pub mod strategy;
pub mod backtest;
pub mod search;
pub mod metrics;
pub mod config_validation;
pub mod error;
