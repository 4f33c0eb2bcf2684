//! Binary search calibration for single-parameter problems
//!
//! The search assumes the evaluated rate is monotonic in the searched value
//! (success rate falls as the withdrawal rises, rises with the starting
//! balance). This is not verified at runtime. With extreme volatility or very
//! short horizons a Monte Carlo evaluator can violate it and the search may
//! settle on a value that is not representative.

use tracing::debug;

use crate::error::ConfigError;

use super::config::{CalibrationConfig, Monotonicity, SearchBounds, validate_rate};
use super::result::{CalibrationResult, CalibrationStep, TerminationReason};

/// Maps a candidate value to a success rate in percent
pub trait Evaluator {
    fn evaluate(&mut self, value: f64) -> f64;
}

impl<F: FnMut(f64) -> f64> Evaluator for F {
    fn evaluate(&mut self, value: f64) -> f64 {
        self(value)
    }
}

/// Bisection root-finder with validated settings
#[derive(Debug, Clone, Copy)]
pub struct Calibrator {
    config: CalibrationConfig,
    direction: Monotonicity,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig, direction: Monotonicity) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, direction })
    }

    #[must_use]
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Search `bounds` for a value whose rate is within the tolerance band of `target`
    pub fn calibrate<E: Evaluator + ?Sized>(
        &self,
        evaluator: &mut E,
        target: f64,
        bounds: SearchBounds,
    ) -> CalibrationResult {
        let mut low = bounds.lower();
        let mut high = bounds.upper();
        let mut steps = Vec::with_capacity(self.config.max_iterations);
        let mut termination_reason = TerminationReason::MaxIterationsReached;

        for iteration in 1..=self.config.max_iterations {
            let mid = f64::midpoint(low, high);
            let rate = evaluator.evaluate(mid);
            let accepted = (rate - target).abs() <= self.config.tolerance_band;

            debug!(iteration, value = mid, rate, target, accepted, "calibration step");

            steps.push(CalibrationStep {
                iteration,
                value: mid,
                rate,
                accepted,
            });

            if accepted && self.config.stop_on_accept {
                termination_reason = TerminationReason::Accepted;
                break;
            }

            // Move toward the side that brings the rate back to target
            let overshoot = rate > target;
            match (self.direction, overshoot) {
                (Monotonicity::Decreasing, true) | (Monotonicity::Increasing, false) => low = mid,
                (Monotonicity::Decreasing, false) | (Monotonicity::Increasing, true) => high = mid,
            }

            if high - low < self.config.tolerance {
                termination_reason = TerminationReason::BoundsCollapsed;
                break;
            }
        }

        finish(steps, termination_reason)
    }
}

fn finish(steps: Vec<CalibrationStep>, termination_reason: TerminationReason) -> CalibrationResult {
    let (count, value_sum, rate_sum) = steps
        .iter()
        .filter(|s| s.accepted)
        .fold((0usize, 0.0, 0.0), |(n, v, r), s| (n + 1, v + s.value, r + s.rate));

    let (value, success_rate) = if count > 0 {
        (value_sum / count as f64, rate_sum / count as f64)
    } else {
        // max_iterations >= 1, so at least one midpoint was evaluated
        steps
            .last()
            .map_or((f64::NAN, f64::NAN), |s| (s.value, s.rate))
    };

    CalibrationResult {
        value,
        success_rate,
        converged: count > 0,
        termination_reason,
        iterations: steps.len(),
        steps,
    }
}

/// Validate every input, then bisect `[lower_bound, upper_bound]` for `target`
pub fn calibrate<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    target: f64,
    lower_bound: f64,
    upper_bound: f64,
    direction: Monotonicity,
    config: &CalibrationConfig,
) -> Result<CalibrationResult, ConfigError> {
    validate_rate("target", target)?;
    let bounds = SearchBounds::new(lower_bound, upper_bound)?;
    let calibrator = Calibrator::new(*config, direction)?;
    Ok(calibrator.calibrate(evaluator, target, bounds))
}
