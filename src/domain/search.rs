//! Exhaustive (window size, leverage) grid search for the rotary strategy.

use crate::domain::backtest::simulate;
use crate::domain::error::RotasimError;
use crate::domain::price::PriceSeries;
use crate::domain::strategy::{RotaryStrategy, StrategyConfig};
use log::{debug, info};
use rayon::prelude::*;

/// Candidate window sizes and leverages.
///
/// Cells are enumerated window-major: every leverage for the first window,
/// then every leverage for the second, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGrid {
    pub window_sizes: Vec<usize>,
    pub leverages: Vec<f64>,
    pub parallel: bool,
}

impl SearchGrid {
    pub fn new(window_sizes: Vec<usize>, leverages: Vec<f64>) -> Self {
        Self {
            window_sizes,
            leverages,
            parallel: false,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn size(&self) -> usize {
        self.window_sizes.len() * self.leverages.len()
    }

    pub fn max_window(&self) -> Option<usize> {
        self.window_sizes.iter().copied().max()
    }

    pub fn cells(&self) -> Vec<(usize, f64)> {
        self.window_sizes
            .iter()
            .flat_map(|&ws| self.leverages.iter().map(move |&lev| (ws, lev)))
            .collect()
    }

    pub fn validate(&self) -> Result<(), RotasimError> {
        if self.window_sizes.is_empty() {
            return Err(RotasimError::invalid_parameter(
                "window_sizes",
                "at least one window size is required",
            ));
        }
        if self.window_sizes.contains(&0) {
            return Err(RotasimError::invalid_parameter(
                "window_sizes",
                "window sizes must be positive",
            ));
        }
        if self.leverages.is_empty() {
            return Err(RotasimError::invalid_parameter(
                "leverages",
                "at least one leverage is required",
            ));
        }
        if self
            .leverages
            .iter()
            .any(|l| !l.is_finite() || *l < 0.0 || *l > StrategyConfig::MAX_LEVERAGE)
        {
            return Err(RotasimError::invalid_parameter(
                "leverages",
                format!("leverages must be between 0 and {}", StrategyConfig::MAX_LEVERAGE),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellResult {
    pub window_size: usize,
    pub leverage: f64,
    pub growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestParams {
    pub leverage: f64,
    pub window_size: usize,
    /// Terminal invested sum of the winning cell; 0.0 if no cell beat the floor.
    pub growth: f64,
}

/// Simulates every grid cell and returns the results in enumeration order.
///
/// Every cell simulates the same trailing date range. A cell with window `w`
/// starts `max_window - w` bars into the series, so its warm-up ends on the
/// same date as every other cell's.
pub fn evaluate_grid(
    series: &PriceSeries,
    grid: &SearchGrid,
    base: &StrategyConfig,
) -> Result<Vec<CellResult>, RotasimError> {
    grid.validate()?;
    base.validate()?;

    let max_window = grid.max_window().unwrap_or(0);
    if series.len() < max_window + 2 {
        return Err(RotasimError::InsufficientData {
            bars: series.len(),
            minimum: max_window + 2,
        });
    }

    let run_cell = |&(window_size, leverage): &(usize, f64)| -> Result<CellResult, RotasimError> {
        let config = base
            .clone()
            .with_window_size(window_size)
            .with_leverage(leverage);
        let bars = series.tail(max_window - window_size);
        let mut strategy = RotaryStrategy::new(bars, config)?;
        let growth = simulate(&mut strategy).final_value();
        debug!("window {} leverage {}: growth x{:.4}", window_size, leverage, growth);
        Ok(CellResult {
            window_size,
            leverage,
            growth,
        })
    };

    let cells = grid.cells();
    if grid.parallel {
        cells.par_iter().map(run_cell).collect()
    } else {
        cells.iter().map(run_cell).collect()
    }
}

/// Picks the first cell with strictly the highest terminal growth.
///
/// Falls back to leverage 1 and the first window size when no cell ends above 0.
pub fn select_best(results: &[CellResult], grid: &SearchGrid) -> BestParams {
    let mut best = BestParams {
        leverage: 1.0,
        window_size: grid.window_sizes.first().copied().unwrap_or(0),
        growth: 0.0,
    };
    for r in results {
        if r.growth > best.growth {
            best = BestParams {
                leverage: r.leverage,
                window_size: r.window_size,
                growth: r.growth,
            };
        }
    }
    best
}

pub fn calculate_best_params(
    series: &PriceSeries,
    grid: &SearchGrid,
    base: &StrategyConfig,
) -> Result<BestParams, RotasimError> {
    info!(
        "Searching {} windows x {} leverages over {} bars{}",
        grid.window_sizes.len(),
        grid.leverages.len(),
        series.len(),
        if grid.parallel { " (parallel)" } else { "" },
    );
    let results = evaluate_grid(series, grid, base)?;
    let best = select_best(&results, grid);
    info!(
        "Best parameters: leverage {}, window {} (growth x{:.2})",
        best.leverage, best.window_size, best.growth
    );
    Ok(best)
}
