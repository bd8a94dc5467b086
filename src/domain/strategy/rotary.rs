//! Rotary moving-average strategy.
//!
//! Holds the leveraged product while the close is above its moving average
//! and sits in cash while it is below. Every day runs, in order:
//!
//! 1. yearly high-watermark reset
//! 2. overnight and intraday leveraged moves plus TER (only while held)
//! 3. certificate fee
//! 4. rotation on a strict close/MA cross, with spread and optional tax
//! 5. performance fee above the watermark
//! 6. weekend TER on Fridays (only while held)
//!
//! Each step reads the invested sum left by the previous one.

use super::{StrategyConfig, StrategyState, TradingStrategy};
use crate::domain::error::RotasimError;
use crate::domain::fees::{WEEKEND_FEE_DAYS, daily_fee, daily_price_change, offset_tax};
use crate::domain::indicator::moving_average;
use crate::domain::price::PriceBar;
use chrono::Datelike;

#[derive(Debug, Clone)]
pub struct RotaryStrategy<'a> {
    bars: &'a [PriceBar],
    ma: Vec<f64>,
    config: StrategyConfig,
    state: StrategyState,
}

impl<'a> RotaryStrategy<'a> {
    /// Builds the strategy over `bars`, dropping the first `window_size`
    /// bars as moving-average warm-up.
    ///
    /// The position starts held. If the first simulated close is above its
    /// average the entry spread is charged up front.
    pub fn new(bars: &'a [PriceBar], config: StrategyConfig) -> Result<Self, RotasimError> {
        config.validate()?;
        let window = config.window_size.ok_or_else(|| {
            RotasimError::invalid_parameter("window_size", "required for the rotary strategy")
        })?;
        if bars.len() <= window {
            return Err(RotasimError::InsufficientData {
                bars: bars.len(),
                minimum: window + 1,
            });
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ma = moving_average(&closes, window, config.moving_average).split_off(window);
        let bars = &bars[window..];

        let mut state = StrategyState::new(bars[0].date);
        if bars[0].close > ma[0] {
            state.invested_sum -= config.spread * state.invested_sum;
        }
        // the performance fee starts counting from the opening capital, not zero
        state.high_watermark = state.invested_sum;

        Ok(Self {
            bars,
            ma,
            config,
            state,
        })
    }

    /// Moving average aligned with [`TradingStrategy::bars`].
    pub fn moving_average(&self) -> &[f64] {
        &self.ma
    }

    pub fn is_bought(&self) -> bool {
        self.state.bought
    }
}

impl TradingStrategy for RotaryStrategy<'_> {
    fn update(&mut self, i: usize) -> f64 {
        let today = &self.bars[i];
        let yesterday = &self.bars[i - 1];
        let ma = self.ma[i];
        let cfg = &self.config;
        let state = &mut self.state;

        let year = today.date.year();
        if year != state.last_year {
            state.last_year = year;
            // the performance fee starts counting from the opening capital, not zero
        state.high_watermark = state.invested_sum;
        }

        if state.bought {
            state.invested_sum += daily_price_change(
                today.open,
                yesterday.close,
                cfg.leverage,
                state.invested_sum,
                cfg.circuit_breakers,
            );
            state.invested_sum += daily_price_change(
                today.close,
                today.open,
                cfg.leverage,
                state.invested_sum,
                cfg.circuit_breakers,
            );
            state.invested_sum -= daily_fee(state.invested_sum, &[cfg.ter]);
        }

        state.invested_sum -= daily_fee(state.invested_sum, &[cfg.certificate_fee]);

        if today.close > ma && !state.bought {
            state.bought = true;
            state.last_tax_buy_value = state.invested_sum;
            state.invested_sum -= cfg.spread * state.invested_sum;
        } else if today.close < ma && state.bought {
            state.bought = false;
            if cfg.tax_at_rotation {
                let gain = state.invested_sum - state.last_tax_buy_value;
                if gain > 0.0 {
                    let (tax, losses) = offset_tax(gain, cfg.tax_rate, state.accumulated_losses);
                    state.accumulated_losses = losses;
                    state.invested_sum -= tax;
                } else {
                    state.accumulated_losses -= gain;
                }
            }
            state.invested_sum -= cfg.spread * state.invested_sum;
        }

        if state.invested_sum > state.high_watermark {
            let new_high_watermark = state.invested_sum;
            state.invested_sum -= (state.invested_sum - state.high_watermark) * cfg.performance_fee;
            state.high_watermark = new_high_watermark;
        }

        if today.is_friday() && state.bought {
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
