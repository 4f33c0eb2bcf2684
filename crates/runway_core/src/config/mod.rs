//! Simulation configuration
//!
//! The main configuration type is `SimulationConfig`, which contains everything
//! needed to run an ensemble. Every field has a serde default, so a partial
//! YAML or JSON document deserializes into a complete config.
//!
//! # Builder DSL
//!
//! ```ignore
//! use runway_core::config::SimulationBuilder;
//!
//! let config = SimulationBuilder::new()
//!     .starting_balance(1_000_000.0)
//!     .years(30)
//!     .target(85.0)
//!     .thresholds(75.0, 95.0)
//!     .seed(42)
//!     .build()?;
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::MarketModel;
use crate::optimization::{CalibrationConfig, validate_rate};

pub mod builder;

pub use builder::SimulationBuilder;

fn default_starting_balance() -> f64 {
    1_000_000.0
}

fn default_horizon_years() -> usize {
    30
}

fn default_outer_paths() -> usize {
    2_000
}

fn default_inner_paths() -> usize {
    100
}

fn default_target_success_rate() -> f64 {
    85.0
}

fn default_lower_threshold() -> f64 {
    75.0
}

fn default_upper_threshold() -> f64 {
    95.0
}

fn default_yearly_calibration() -> CalibrationConfig {
    CalibrationConfig::yearly()
}

fn default_min_completion_ratio() -> f64 {
    1.0
}

/// How path seeds are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeedStrategy {
    /// Reproducible: every path seed derives from this base seed and the path index
    Fixed(u64),
    /// Draw a fresh base seed from the thread RNG
    #[default]
    Entropy,
}

impl SeedStrategy {
    /// Resolve to the base seed recorded with the results
    #[must_use]
    pub fn base_seed(&self) -> u64 {
        match self {
            SeedStrategy::Fixed(seed) => *seed,
            SeedStrategy::Entropy => rand::rng().random(),
        }
    }
}

/// Seed for outer path `index`; the base seed itself drives the initial calibration
///
/// The base is hashed before the index is mixed in, so runs with neighbouring
/// base seeds do not share path streams.
#[inline]
#[must_use]
pub fn path_seed(base_seed: u64, index: usize) -> u64 {
    splitmix64(splitmix64(base_seed) ^ index as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Complete ensemble configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub market: MarketModel,

    #[serde(default = "default_starting_balance")]
    pub starting_balance: f64,

    #[serde(default = "default_horizon_years")]
    pub horizon_years: usize,

    /// Number of outer paths simulated with the dynamic policy
    #[serde(default = "default_outer_paths")]
    pub outer_paths: usize,

    /// Paths per success-rate estimate during the initial calibration
    #[serde(default = "default_outer_paths")]
    pub calibration_paths: usize,

    /// Paths per success-rate estimate inside the yearly re-solve
    #[serde(default = "default_inner_paths")]
    pub inner_paths: usize,

    #[serde(default = "default_target_success_rate")]
    pub target_success_rate: f64,

    /// Re-solve when the continuing success rate drops below this
    #[serde(default = "default_lower_threshold")]
    pub lower_threshold: f64,

    /// Re-solve when the continuing success rate rises above this
    #[serde(default = "default_upper_threshold")]
    pub upper_threshold: f64,

    #[serde(default)]
    pub withdrawal_floor: Option<f64>,

    #[serde(default)]
    pub withdrawal_cap: Option<f64>,

    #[serde(default)]
    pub initial_calibration: CalibrationConfig,

    #[serde(default = "default_yearly_calibration")]
    pub yearly_calibration: CalibrationConfig,

    #[serde(default)]
    pub seed: SeedStrategy,

    /// Fraction of outer paths that must complete before percentiles are computed
    #[serde(default = "default_min_completion_ratio")]
    pub min_completion_ratio: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            market: MarketModel::default(),
            starting_balance: default_starting_balance(),
            horizon_years: default_horizon_years(),
            outer_paths: default_outer_paths(),
            calibration_paths: default_outer_paths(),
            inner_paths: default_inner_paths(),
            target_success_rate: default_target_success_rate(),
            lower_threshold: default_lower_threshold(),
            upper_threshold: default_upper_threshold(),
            withdrawal_floor: None,
            withdrawal_cap: None,
            initial_calibration: CalibrationConfig::default(),
            yearly_calibration: default_yearly_calibration(),
            seed: SeedStrategy::default(),
            min_completion_ratio: default_min_completion_ratio(),
        }
    }
}

fn validate_count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositive { field });
    }
    Ok(())
}

fn validate_amount(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be non-negative and finite",
        });
    }
    Ok(())
}

impl SimulationConfig {
    /// Check every parameter; run before any simulation work starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_count("horizon_years", self.horizon_years)?;
        validate_count("outer_paths", self.outer_paths)?;
        validate_count("calibration_paths", self.calibration_paths)?;
        validate_count("inner_paths", self.inner_paths)?;

        validate_amount("market.volatility", self.market.volatility)?;
        if !self.market.real_mean().is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "market.mean_return",
                value: self.market.real_mean(),
                reason: "real mean must be finite",
            });
        }

        validate_amount("starting_balance", self.starting_balance)?;
        if self.starting_balance == 0.0 {
            return Err(ConfigError::InvalidBounds {
                lower: 0.0,
                upper: self.starting_balance,
            });
        }

        validate_rate("target_success_rate", self.target_success_rate)?;
        validate_rate("lower_threshold", self.lower_threshold)?;
        validate_rate("upper_threshold", self.upper_threshold)?;
        if self.lower_threshold > self.upper_threshold {
            return Err(ConfigError::ThresholdOrder {
                lower: self.lower_threshold,
                upper: self.upper_threshold,
            });
        }

        if let Some(floor) = self.withdrawal_floor {
            validate_amount("withdrawal_floor", floor)?;
        }
        if let Some(cap) = self.withdrawal_cap {
            validate_amount("withdrawal_cap", cap)?;
        }
        if let (Some(floor), Some(cap)) = (self.withdrawal_floor, self.withdrawal_cap)
            && floor > cap
        {
            return Err(ConfigError::FloorAboveCap { floor, cap });
        }

        self.initial_calibration.validate()?;
        self.yearly_calibration.validate()?;

        if !(0.0..=1.0).contains(&self.min_completion_ratio) {
            return Err(ConfigError::InvalidValue {
                field: "min_completion_ratio",
                value: self.min_completion_ratio,
                reason: "must be within [0, 1]",
            });
        }

        Ok(())
    }

    /// Minimum completed paths required by the aggregator
    #[must_use]
    pub fn min_completed_paths(&self) -> usize {
        (self.outer_paths as f64 * self.min_completion_ratio).ceil() as usize
    }
}
