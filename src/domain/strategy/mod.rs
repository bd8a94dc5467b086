//! Strategy parameters, per-run state and the day-step contract.
//!
//! A strategy borrows a slice of [`PriceBar`]s, owns exactly one
//! [`StrategyState`], and advances it one day at a time through
//! [`TradingStrategy::update`].

pub mod buy_and_hold;
pub mod rotary;

pub use buy_and_hold::BuyAndHoldStrategy;
pub use rotary::RotaryStrategy;

use crate::domain::error::RotasimError;
use crate::domain::fees::CAPITAL_GAINS_TAX_RATE;
use crate::domain::indicator::MovingAverageKind;
use crate::domain::price::PriceBar;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    BuyAndHold,
    Rotary,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::BuyAndHold => write!(f, "buy_and_hold"),
            StrategyKind::Rotary => write!(f, "rotary"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = RotasimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy_and_hold" | "buy-and-hold" | "hold" => Ok(StrategyKind::BuyAndHold),
            "rotary" | "rotary_ma" => Ok(StrategyKind::Rotary),
            other => Err(RotasimError::invalid_parameter(
                "kind",
                format!("unknown strategy kind '{}'", other),
            )),
        }
    }
}

/// Immutable parameter bundle for one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub leverage: f64,
    /// Annual total expense ratio, charged only while invested.
    pub ter: f64,
    /// Fractional cost of each position change.
    pub spread: f64,
    /// Annual issuer fee, charged whether invested or not.
    pub certificate_fee: f64,
    /// Share of gains above the yearly high watermark.
    pub performance_fee: f64,
    pub tax_rate: f64,
    pub tax_at_rotation: bool,
    pub circuit_breakers: bool,
    pub window_size: Option<usize>,
    pub moving_average: MovingAverageKind,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            leverage: 1.0,
            ter: 0.0,
            spread: 0.0,
            certificate_fee: 0.0,
            performance_fee: 0.0,
            tax_rate: CAPITAL_GAINS_TAX_RATE,
            tax_at_rotation: false,
            circuit_breakers: false,
            window_size: None,
            moving_average: MovingAverageKind::Simple,
        }
    }
}

impl StrategyConfig {
    pub const MAX_LEVERAGE: f64 = 10.0;

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = Some(window_size);
        self
    }

    pub fn validate(&self) -> Result<(), RotasimError> {
        if !self.leverage.is_finite() || self.leverage < 0.0 || self.leverage > Self::MAX_LEVERAGE {
            return Err(RotasimError::invalid_parameter(
                "leverage",
                format!("must be between 0 and {}", Self::MAX_LEVERAGE),
            ));
        }
        for (name, value) in [
            ("ter", self.ter),
            ("spread", self.spread),
            ("certificate_fee", self.certificate_fee),
            ("performance_fee", self.performance_fee),
            ("tax_rate", self.tax_rate),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(RotasimError::invalid_parameter(
                    name,
                    "must be a fraction in [0, 1)",
                ));
            }
        }
        if self.window_size == Some(0) {
            return Err(RotasimError::invalid_parameter(
                "window_size",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Mutable bookkeeping of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyState {
    /// Normalized capital; starts at 1.0.
    pub invested_sum: f64,
    pub bought: bool,
    /// `invested_sum` at the last buy, basis for realized gains.
    pub last_tax_buy_value: f64,
    /// Realized losses carried forward against future tax.
    pub accumulated_losses: f64,
    /// Performance-fee threshold for the current year. Starts at the opening
    /// capital, so only gains above it are charged, never the capital itself.
    pub high_watermark: f64,
    pub last_year: i32,
}

impl StrategyState {
    pub fn new(first_date: NaiveDate) -> Self {
        Self {
            invested_sum: 1.0,
            bought: true,
            last_tax_buy_value: 1.0,
            accumulated_losses: 0.0,
            high_watermark: 1.0,
            last_year: first_date.year(),
        }
    }
}

/// Day-step contract shared by every strategy.
///
/// `update(i)` reads bars `i - 1` and `i`, so it must be called with
/// `1 <= i < bars().len()`, once per day in increasing order.
pub trait TradingStrategy {
    fn update(&mut self, index: usize) -> f64;

    fn state(&self) -> &StrategyState;

    fn config(&self) -> &StrategyConfig;

    /// Bars the strategy simulates over, after any warm-up was removed.
    fn bars(&self) -> &[PriceBar];

    fn invested_sum(&self) -> f64 {
        self.state().invested_sum
    }

    fn dates(&self) -> Vec<NaiveDate> {
        self.bars().iter().map(|b| b.date).collect()
    }
}

pub fn build_strategy<'a>(
    kind: StrategyKind,
    bars: &'a [PriceBar],
    config: &StrategyConfig,
) -> Result<Box<dyn TradingStrategy + 'a>, RotasimError> {
    Ok(match kind {
        StrategyKind::BuyAndHold => Box::new(BuyAndHoldStrategy::new(bars, config.clone())?),
        StrategyKind::Rotary => Box::new(RotaryStrategy::new(bars, config.clone())?),
    })
}
