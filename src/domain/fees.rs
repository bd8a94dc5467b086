//! Fee, price-change and tax primitives shared by every strategy.

/// Capital-gains tax rate (25% + 5.5% solidarity surcharge).
pub const CAPITAL_GAINS_TAX_RATE: f64 = 0.26375;

/// Largest single-day fractional loss when circuit breakers are on.
pub const CIRCUIT_BREAKER_FLOOR: f64 = -0.2;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Extra days of fees charged on a Friday to cover the weekend.
pub const WEEKEND_FEE_DAYS: f64 = 2.0;

/// Leveraged change of `invested_sum` when the underlying moves from
/// `yesterday` to `today`.
pub fn daily_price_change(
    today: f64,
    yesterday: f64,
    leverage: f64,
    invested_sum: f64,
    circuit_breakers: bool,
) -> f64 {
    let mut change = (today - yesterday) / yesterday;
    if circuit_breakers {
        change = change.max(CIRCUIT_BREAKER_FLOOR);
    }
    leverage * invested_sum * change
}

/// One day's share of the given annual fee rates.
///
/// Each rate is taken against the same `invested_sum`, so several components
/// charged together do not compound.
pub fn daily_fee(invested_sum: f64, annual_rates: &[f64]) -> f64 {
    annual_rates
        .iter()
        .map(|&rate| invested_sum * rate / DAYS_PER_YEAR)
        .sum()
}

/// Tax due on a realized gain after carried-forward losses are applied.
///
/// Returns `(tax, remaining_losses)`; at most one of the two is positive.
pub fn offset_tax(gain: f64, tax_rate: f64, accumulated_losses: f64) -> (f64, f64) {
    let tax = gain * tax_rate;
    if tax > accumulated_losses {
        (tax - accumulated_losses, 0.0)
    } else {
        (0.0, accumulated_losses - tax)
    }
}
