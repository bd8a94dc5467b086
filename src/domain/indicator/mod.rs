//! Moving-average providers consumed by the rotary strategy.
//!
//! Both variants return a series the same length as the input. The simple
//! average leaves its first `window - 1` entries as NaN; callers slice that
//! warm-up off before reading.

pub mod ema;
pub mod sma;

use crate::domain::error::RotasimError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MovingAverageKind {
    #[default]
    Simple,
    Exponential,
}

impl fmt::Display for MovingAverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovingAverageKind::Simple => write!(f, "sma"),
            MovingAverageKind::Exponential => write!(f, "ema"),
        }
    }
}

impl FromStr for MovingAverageKind {
    type Err = RotasimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sma" | "simple" => Ok(MovingAverageKind::Simple),
            "ema" | "exponential" => Ok(MovingAverageKind::Exponential),
            _ => Err(RotasimError::UnknownMovingAverage {
                kind: s.to_string(),
            }),
        }
    }
}

pub fn moving_average(values: &[f64], window: usize, kind: MovingAverageKind) -> Vec<f64> {
    match kind {
        MovingAverageKind::Simple => sma::calculate_sma(values, window),
        MovingAverageKind::Exponential => ema::calculate_ema(values, window),
    }
}
