//! Fluent builder for `SimulationConfig`

use crate::error::ConfigError;
use crate::model::MarketModel;
use crate::optimization::CalibrationConfig;

use super::{SeedStrategy, SimulationConfig};

/// Builder for ensemble configurations
///
/// Starts from the defaults of `SimulationConfig` and validates on `build()`.
#[derive(Debug, Clone, Default)]
pub struct SimulationBuilder {
    config: SimulationConfig,
}

impl SimulationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn market(mut self, market: MarketModel) -> Self {
        self.config.market = market;
        self
    }

    /// Nominal mean return and volatility, keeping inflation and fee
    #[must_use]
    pub fn returns(mut self, mean_return: f64, volatility: f64) -> Self {
        self.config.market.mean_return = mean_return;
        self.config.market.volatility = volatility;
        self
    }

    #[must_use]
    pub fn inflation(mut self, inflation: f64) -> Self {
        self.config.market.inflation = inflation;
        self
    }

    #[must_use]
    pub fn fee(mut self, fee: f64) -> Self {
        self.config.market.fee = fee;
        self
    }

    #[must_use]
    pub fn starting_balance(mut self, balance: f64) -> Self {
        self.config.starting_balance = balance;
        self
    }

    #[must_use]
    pub fn years(mut self, years: usize) -> Self {
        self.config.horizon_years = years;
        self
    }

    #[must_use]
    pub fn outer_paths(mut self, paths: usize) -> Self {
        self.config.outer_paths = paths;
        self
    }

    #[must_use]
    pub fn calibration_paths(mut self, paths: usize) -> Self {
        self.config.calibration_paths = paths;
        self
    }

    #[must_use]
    pub fn inner_paths(mut self, paths: usize) -> Self {
        self.config.inner_paths = paths;
        self
    }

    #[must_use]
    pub fn target(mut self, success_rate: f64) -> Self {
        self.config.target_success_rate = success_rate;
        self
    }

    #[must_use]
    pub fn thresholds(mut self, lower: f64, upper: f64) -> Self {
        self.config.lower_threshold = lower;
        self.config.upper_threshold = upper;
        self
    }

    #[must_use]
    pub fn floor(mut self, floor: f64) -> Self {
        self.config.withdrawal_floor = Some(floor);
        self
    }

    #[must_use]
    pub fn cap(mut self, cap: f64) -> Self {
        self.config.withdrawal_cap = Some(cap);
        self
    }

    #[must_use]
    pub fn initial_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.config.initial_calibration = calibration;
        self
    }

    #[must_use]
    pub fn yearly_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.config.yearly_calibration = calibration;
        self
    }

    /// Fix the base seed for reproducible runs
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = SeedStrategy::Fixed(seed);
        self
    }

    #[must_use]
    pub fn min_completion_ratio(mut self, ratio: f64) -> Self {
        self.config.min_completion_ratio = ratio;
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
