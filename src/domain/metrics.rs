//! Summary statistics of a finished run.

use crate::domain::backtest::BacktestResult;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Terminal value after the deferred capital-gains tax.
    pub final_value: f64,
    /// Annual growth factor, e.g. 1.12 for +12% a year.
    pub cagr: f64,
    /// Worst later/earlier ratio minus one; negative once the path has fallen.
    pub max_drawdown: f64,
    pub years: f64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let trajectory = &result.trajectory;
        let state = &result.final_state;

        let final_value = after_tax_final_value(
            trajectory.final_value(),
            state.last_tax_buy_value,
            state.accumulated_losses,
            result.config.tax_rate,
        );

        let years = match (trajectory.dates.first(), trajectory.dates.last()) {
            (Some(first), Some(last)) => (*last - *first).num_days() as f64 / DAYS_PER_YEAR,
            _ => 0.0,
        };

        Metrics {
            final_value,
            cagr: calculate_cagr(final_value, years),
            max_drawdown: calculate_max_drawdown(&trajectory.values),
            years,
        }
    }
}

/// Terminal value less the tax still owed on the open gain, net of carried losses.
pub fn after_tax_final_value(
    final_value: f64,
    last_tax_buy_value: f64,
    accumulated_losses: f64,
    tax_rate: f64,
) -> f64 {
    let tax = (final_value - last_tax_buy_value) * tax_rate - accumulated_losses;
    final_value - tax.max(0.0)
}

pub fn calculate_cagr(growth: f64, years: f64) -> f64 {
    growth.powf(1.0 / years)
}

/// Lowest ratio of any value to an earlier value, minus one.
pub fn calculate_max_drawdown(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mut peak = values[0];
    let mut worst = f64::INFINITY;

    for &v in &values[1..] {
        let ratio = v / peak;
        if ratio < worst {
            worst = ratio;
        }
        if v > peak {
            peak = v;
        }
    }

    worst - 1.0
}

/// Growth factor to a signed percentage string, e.g. 1.1234 → "12.34%".
pub fn factor_to_percentage(factor: f64) -> String {
    format!("{:.2}%", (factor - 1.0) * 100.0)
}

/// Truncates to two decimals.
pub fn floor2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}
