//! Buy-and-hold: always invested, pays TER, never rotates or realizes tax.

use super::{StrategyConfig, StrategyState, TradingStrategy};
use crate::domain::error::RotasimError;
use crate::domain::fees::{WEEKEND_FEE_DAYS, daily_fee, daily_price_change};
use crate::domain::price::PriceBar;

#[derive(Debug, Clone)]
pub struct BuyAndHoldStrategy<'a> {
    bars: &'a [PriceBar],
    config: StrategyConfig,
    state: StrategyState,
}

impl<'a> BuyAndHoldStrategy<'a> {
    pub fn new(bars: &'a [PriceBar], config: StrategyConfig) -> Result<Self, RotasimError> {
        config.validate()?;
        let first = bars.first().ok_or(RotasimError::InsufficientData {
            bars: 0,
            minimum: 1,
        })?;
        Ok(Self {
            bars,
            state: StrategyState::new(first.date),
            config,
        })
    }
}

impl TradingStrategy for BuyAndHoldStrategy<'_> {
    fn update(&mut self, i: usize) -> f64 {
        let today = &self.bars[i];
        let yesterday = &self.bars[i - 1];
        let cfg = &self.config;
        let state = &mut self.state;

        state.invested_sum += daily_price_change(
            today.close,
            yesterday.close,
            cfg.leverage,
            state.invested_sum,
            cfg.circuit_breakers,
        );

        state.invested_sum -= daily_fee(state.invested_sum, &[cfg.ter]);

        if today.is_friday() {
            state.invested_sum -= WEEKEND_FEE_DAYS * daily_fee(state.invested_sum, &[cfg.ter]);
        }

        state.invested_sum
    }

    fn state(&self) -> &StrategyState {
        &self.state
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn bars(&self) -> &[PriceBar] {
        self.bars
    }
}
