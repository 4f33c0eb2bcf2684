//! Dynamic withdrawal policy
//!
//! At the start of every year after the first, the policy estimates the
//! success rate of continuing at the current withdrawal over the remaining
//! horizon. When that rate leaves the `[lower, upper]` threshold band the
//! withdrawal is re-solved with the calibrator against the target rate, using
//! the path's current balance as the upper search bound.

use rand::Rng;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::metrics::PathMetrics;
use crate::model::ReturnSampler;
use crate::optimization::{Calibrator, Monotonicity, SearchBounds};
use crate::simulation::{WithdrawalSchedule, success_rate};

/// Immutable policy settings shared by every outer path
#[derive(Debug, Clone)]
pub struct DynamicWithdrawalPolicy {
    sampler: ReturnSampler,
    calibrator: Calibrator,
    target_success_rate: f64,
    lower_threshold: f64,
    upper_threshold: f64,
    inner_paths: usize,
    withdrawal_floor: Option<f64>,
    withdrawal_cap: Option<f64>,
}

impl DynamicWithdrawalPolicy {
    pub fn from_config(
        config: &SimulationConfig,
        sampler: ReturnSampler,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sampler,
            calibrator: Calibrator::new(config.yearly_calibration, Monotonicity::Decreasing)?,
            target_success_rate: config.target_success_rate,
            lower_threshold: config.lower_threshold,
            upper_threshold: config.upper_threshold,
            inner_paths: config.inner_paths,
            withdrawal_floor: config.withdrawal_floor,
            withdrawal_cap: config.withdrawal_cap,
        })
    }

    /// Withdrawal for the coming year given the path's balance and remaining horizon
    ///
    /// Keeps `current_withdrawal` while the continuing success rate stays inside
    /// the threshold band, otherwise returns the re-solved and clamped amount.
    pub fn next_withdrawal<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        balance: f64,
        years_remaining: usize,
        current_withdrawal: f64,
        metrics: &mut PathMetrics,
    ) -> f64 {
        if years_remaining == 0 {
            return current_withdrawal;
        }

        let continuing = success_rate(
            &self.sampler,
            rng,
            balance,
            current_withdrawal,
            years_remaining,
            self.inner_paths,
        );
        metrics.record_estimates(1);

        if (self.lower_threshold..=self.upper_threshold).contains(&continuing) {
            return current_withdrawal;
        }

        let Ok(bounds) = SearchBounds::new(0.0, balance) else {
            return current_withdrawal;
        };

        let mut estimates = 0;
        let calibration = self.calibrator.calibrate(
            &mut |withdrawal: f64| {
                estimates += 1;
                success_rate(
                    &self.sampler,
                    &mut *rng,
                    balance,
                    withdrawal,
                    years_remaining,
                    self.inner_paths,
                )
            },
            self.target_success_rate,
            bounds,
        );
        metrics.record_estimates(estimates);
        metrics.record_recalibration(calibration.converged);

        let adjusted = self.clamp(calibration.value);
        debug!(
            balance,
            years_remaining,
            continuing,
            previous = current_withdrawal,
            adjusted,
            converged = calibration.converged,
            "withdrawal re-solved"
        );
        adjusted
    }

    /// Apply the optional cap, then the optional floor
    #[must_use]
    pub fn clamp(&self, withdrawal: f64) -> f64 {
        let capped = self
            .withdrawal_cap
            .map_or(withdrawal, |cap| withdrawal.min(cap));
        self.withdrawal_floor
            .map_or(capped, |floor| capped.max(floor))
    }

    /// Per-path schedule starting from the shared year-1 withdrawal
    pub fn schedule<R: Rng>(&self, initial_withdrawal: f64, rng: R) -> DynamicSchedule<'_, R> {
        DynamicSchedule {
            policy: self,
            rng,
            current: initial_withdrawal,
            metrics: PathMetrics::new(),
        }
    }
}

/// Withdrawal schedule owned by a single path
#[derive(Debug)]
pub struct DynamicSchedule<'a, R> {
    policy: &'a DynamicWithdrawalPolicy,
    rng: R,
    current: f64,
    metrics: PathMetrics,
}

impl<R> DynamicSchedule<'_, R> {
    #[must_use]
    pub fn current_withdrawal(&self) -> f64 {
        self.current
    }

    #[must_use]
    pub fn metrics(&self) -> PathMetrics {
        self.metrics
    }
}

impl<R: Rng> WithdrawalSchedule for DynamicSchedule<'_, R> {
    fn withdrawal(&mut self, year: usize, balance: f64, years_remaining: usize) -> f64 {
        if year > 0 {
            self.current = self.policy.next_withdrawal(
                &mut self.rng,
                balance,
                years_remaining,
                self.current,
                &mut self.metrics,
            );
        }
        self.current
    }
}
