//! Calibration of single withdrawal or balance parameters against a target success rate
//!
//! The root-finder in `binary_search` is generic over an `Evaluator`, so it can
//! be tested against deterministic closed-form functions. The helpers in this
//! module attach the Monte Carlo success-rate estimator to it.
//!
//! # Example
//!
//! ```ignore
//! use runway_core::optimization::{CalibrationConfig, calibrate_initial_withdrawal};
//!
//! let mut rng = SmallRng::seed_from_u64(42);
//! let result = calibrate_initial_withdrawal(
//!     &sampler,
//!     &mut rng,
//!     1_000_000.0,
//!     30,
//!     2_000,
//!     85.0,
//!     &CalibrationConfig::default(),
//! )?;
//! println!("Initial withdrawal: ${:.0}", result.value);
//! ```

mod binary_search;
mod config;
mod result;

pub use binary_search::{Calibrator, Evaluator, calibrate};
pub use config::{CalibrationConfig, Monotonicity, SearchBounds, validate_rate};
pub use result::{CalibrationResult, CalibrationStep, TerminationReason};

use rand::Rng;

use crate::error::ConfigError;
use crate::model::ReturnSampler;
use crate::simulation::success_rate;

/// Largest constant withdrawal whose success rate over `horizon` matches `target`
///
/// Searches `[0, start_balance]`; every midpoint is evaluated on a freshly
/// drawn return matrix of `n_paths` paths.
pub fn calibrate_initial_withdrawal<R: Rng + ?Sized>(
    sampler: &ReturnSampler,
    rng: &mut R,
    start_balance: f64,
    horizon: usize,
    n_paths: usize,
    target: f64,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, ConfigError> {
    validate_estimate_size(horizon, n_paths)?;
    let mut evaluator = |withdrawal: f64| {
        success_rate(sampler, &mut *rng, start_balance, withdrawal, horizon, n_paths)
    };
    calibrate(
        &mut evaluator,
        target,
        0.0,
        start_balance,
        Monotonicity::Decreasing,
        config,
    )
}

/// Starting balance within `[lower_balance, upper_balance]` that sustains a fixed withdrawal at `target`
#[allow(clippy::too_many_arguments)]
pub fn calibrate_required_balance<R: Rng + ?Sized>(
    sampler: &ReturnSampler,
    rng: &mut R,
    withdrawal: f64,
    horizon: usize,
    n_paths: usize,
    target: f64,
    lower_balance: f64,
    upper_balance: f64,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, ConfigError> {
    validate_estimate_size(horizon, n_paths)?;
    if !withdrawal.is_finite() || withdrawal < 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "withdrawal",
            value: withdrawal,
            reason: "must be non-negative and finite",
        });
    }
    let mut evaluator = |balance: f64| {
        success_rate(sampler, &mut *rng, balance, withdrawal, horizon, n_paths)
    };
    calibrate(
        &mut evaluator,
        target,
        lower_balance,
        upper_balance,
        Monotonicity::Increasing,
        config,
    )
}

/// Initial-withdrawal calibration for several targets, in input order
///
/// All targets are validated before the first calibration starts.
pub fn calibrate_targets<R: Rng + ?Sized>(
    sampler: &ReturnSampler,
    rng: &mut R,
    start_balance: f64,
    horizon: usize,
    n_paths: usize,
    targets: &[f64],
    config: &CalibrationConfig,
) -> Result<Vec<(f64, CalibrationResult)>, ConfigError> {
    for &target in targets {
        validate_rate("target", target)?;
    }

    targets
        .iter()
        .map(|&target| {
            let result = calibrate_initial_withdrawal(
                sampler,
                &mut *rng,
                start_balance,
                horizon,
                n_paths,
                target,
                config,
            )?;
            Ok((target, result))
        })
        .collect()
}

fn validate_estimate_size(horizon: usize, n_paths: usize) -> Result<(), ConfigError> {
    if horizon == 0 {
        return Err(ConfigError::NonPositive { field: "horizon" });
    }
    if n_paths == 0 {
        return Err(ConfigError::NonPositive { field: "n_paths" });
    }
    Ok(())
}
