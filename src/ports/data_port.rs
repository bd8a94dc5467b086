//! Price history access port trait.

use crate::domain::error::RotasimError;
use crate::domain::price::PriceSeries;

pub trait DataPort {
    /// Full daily history of `symbol`, ascending by date.
    fn fetch_prices(&self, symbol: &str) -> Result<PriceSeries, RotasimError>;
}
