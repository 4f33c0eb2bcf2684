//! Calibration configuration types

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_tolerance() -> f64 {
    0.01
}

fn default_tolerance_band() -> f64 {
    0.5
}

fn default_max_iterations() -> usize {
    20
}

fn default_true() -> bool {
    true
}

/// Bisection settings shared by every calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Stop once the search bracket is narrower than this (in search units)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Accept a midpoint whose rate is within this many percentage points of the target
    #[serde(default = "default_tolerance_band")]
    pub tolerance_band: f64,

    /// Hard cap on evaluations, bounding the cost of nested searches
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Return on the first accepted midpoint instead of averaging all of them
    #[serde(default = "default_true")]
    pub stop_on_accept: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            tolerance_band: default_tolerance_band(),
            max_iterations: default_max_iterations(),
            stop_on_accept: true,
        }
    }
}

impl CalibrationConfig {
    /// Settings used for the per-year re-solve inside each path
    #[must_use]
    pub fn yearly() -> Self {
        Self {
            max_iterations: 10,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "tolerance",
                value: self.tolerance,
                reason: "must be positive and finite",
            });
        }
        if !self.tolerance_band.is_finite() || self.tolerance_band < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "tolerance_band",
                value: self.tolerance_band,
                reason: "must be non-negative and finite",
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_iterations",
            });
        }
        Ok(())
    }
}

/// How the evaluated rate moves as the searched value grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Monotonicity {
    /// Rate falls as the value rises (withdrawal amount)
    Decreasing,
    /// Rate rises with the value (starting balance)
    Increasing,
}

/// Validated `[lower, upper]` search range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchBounds {
    lower: f64,
    upper: f64,
}

impl SearchBounds {
    pub fn new(lower: f64, upper: f64) -> Result<Self, ConfigError> {
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ConfigError::InvalidBounds { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    #[must_use]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[must_use]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Check that a success-rate percentage lies within [0, 100]
pub fn validate_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::RateOutOfRange { field, value });
    }
    Ok(())
}
