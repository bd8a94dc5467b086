//! Simulation driver: steps a strategy through its date range.

use crate::domain::strategy::{StrategyConfig, StrategyState, TradingStrategy};
use chrono::NaiveDate;

/// Invested-sum path of one run, index-aligned with the strategy's bars.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn final_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(f64::NAN)
    }
}

/// Outcome of a full run: the path plus the end-of-run tax bookkeeping.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub trajectory: Trajectory,
    pub final_state: StrategyState,
    pub config: StrategyConfig,
}

/// Runs `update` for every day after the first and records the invested sum.
///
/// The first value is the sum before any update, so the trajectory has one
/// entry per bar.
pub fn simulate(strategy: &mut dyn TradingStrategy) -> Trajectory {
    let dates = strategy.dates();
    let mut values = Vec::with_capacity(dates.len());
    values.push(strategy.invested_sum());

    for i in 1..dates.len() {
        values.push(strategy.update(i));
    }

    Trajectory { dates, values }
}

pub fn run_backtest(strategy: &mut dyn TradingStrategy) -> BacktestResult {
    let trajectory = simulate(strategy);
    BacktestResult {
        trajectory,
        final_state: strategy.state().clone(),
        config: strategy.config().clone(),
    }
}
