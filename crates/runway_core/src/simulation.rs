//! Path simulation, success-rate estimation and the ensemble orchestrator

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{SimulationConfig, path_seed};
use crate::error::{ConfigError, SimulationError};
use crate::metrics::PathMetrics;
use crate::model::{
    EnsembleResult, PathFailure, PathOutcome, PathResult, ReturnSampler, ReturnSource,
    SampledReturns, YearRecord,
};
use crate::optimization::{CalibrationResult, calibrate_initial_withdrawal};
use crate::policy::DynamicWithdrawalPolicy;

/// Decides the withdrawal taken at the start of each simulated year
pub trait WithdrawalSchedule {
    /// `year` is zero-based; `years_remaining` includes the current year
    fn withdrawal(&mut self, year: usize, balance: f64, years_remaining: usize) -> f64;
}

/// The same withdrawal every year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWithdrawal(pub f64);

impl WithdrawalSchedule for FixedWithdrawal {
    fn withdrawal(&mut self, _year: usize, _balance: f64, _years_remaining: usize) -> f64 {
        self.0
    }
}

impl<F: FnMut(f64, usize) -> f64> WithdrawalSchedule for F {
    fn withdrawal(&mut self, _year: usize, balance: f64, years_remaining: usize) -> f64 {
        self(balance, years_remaining)
    }
}

/// Mutable state of one path, owned by the code simulating it
#[derive(Debug, Clone, Copy)]
struct PathState {
    balance: f64,
    withdrawal: f64,
    years_remaining: usize,
}

/// Terminal state of a walk, without the trace
#[derive(Debug, Clone, Copy)]
struct Walk {
    ending_balance: f64,
    depleted: bool,
    growth: f64,
    realized_years: usize,
}

impl Walk {
    fn survived(&self) -> bool {
        !self.depleted && self.ending_balance > 0.0
    }

    fn cagr(&self) -> f64 {
        if self.realized_years == 0 {
            return 0.0;
        }
        self.growth.max(0.0).powf(1.0 / self.realized_years as f64) - 1.0
    }
}

/// Withdraw-then-grow loop shared by traced and untraced simulations
fn walk<W, S, F>(
    start_balance: f64,
    horizon: usize,
    schedule: &mut W,
    returns: &mut S,
    mut on_year: F,
) -> Walk
where
    W: WithdrawalSchedule + ?Sized,
    S: ReturnSource + ?Sized,
    F: FnMut(YearRecord),
{
    let mut state = PathState {
        balance: start_balance.max(0.0),
        withdrawal: 0.0,
        years_remaining: horizon,
    };
    let mut growth = 1.0;
    let mut realized_years = 0;
    let mut depleted = false;

    for year in 0..horizon {
        let beginning_balance = state.balance;
        state.withdrawal = schedule
            .withdrawal(year, beginning_balance, state.years_remaining)
            .max(0.0);
        let post_withdrawal = beginning_balance - state.withdrawal;

        if post_withdrawal <= 0.0 {
            // Only what was left could actually be withdrawn
            on_year(YearRecord {
                year: year + 1,
                beginning_balance,
                withdrawal: beginning_balance,
                post_withdrawal_balance: 0.0,
                applied_return: 0.0,
                ending_balance: 0.0,
            });
            state.balance = 0.0;
            depleted = true;
            break;
        }

        let applied_return = returns.next_return(year);
        growth *= 1.0 + applied_return;
        realized_years += 1;
        state.years_remaining -= 1;

        let ending_balance = (post_withdrawal * (1.0 + applied_return)).max(0.0);
        on_year(YearRecord {
            year: year + 1,
            beginning_balance,
            withdrawal: state.withdrawal,
            post_withdrawal_balance: post_withdrawal,
            applied_return,
            ending_balance,
        });
        state.balance = ending_balance;

        if ending_balance <= 0.0 {
            depleted = true;
            break;
        }
    }

    Walk {
        ending_balance: state.balance,
        depleted,
        growth,
        realized_years,
    }
}

/// Simulate one path year by year, recording a trace
///
/// The trace stops at depletion, so it can be shorter than `horizon`.
pub fn simulate_path<W, S>(
    start_balance: f64,
    horizon: usize,
    schedule: &mut W,
    returns: &mut S,
) -> PathResult
where
    W: WithdrawalSchedule + ?Sized,
    S: ReturnSource + ?Sized,
{
    let mut years = Vec::with_capacity(horizon);
    let walk = walk(start_balance, horizon, schedule, returns, |record| {
        years.push(record);
    });

    PathResult {
        years,
        cagr: walk.cagr(),
        depleted: walk.depleted,
        metrics: PathMetrics::default(),
    }
}

/// Percentage of `n_paths` fresh paths that end the horizon with a positive balance
///
/// Each call draws a new return matrix, so repeated calls with the same
/// arguments differ unless the RNG is reseeded. Zero paths is a configuration
/// error rather than a 0 % estimate.
pub fn estimate_success_rate<R: Rng + ?Sized>(
    sampler: &ReturnSampler,
    rng: &mut R,
    start_balance: f64,
    withdrawal: f64,
    horizon: usize,
    n_paths: usize,
) -> Result<f64, ConfigError> {
    if n_paths == 0 {
        return Err(ConfigError::NonPositive { field: "n_paths" });
    }
    Ok(success_rate(sampler, rng, start_balance, withdrawal, horizon, n_paths))
}

/// [`estimate_success_rate`] for callers that already validated `n_paths > 0`
pub(crate) fn success_rate<R: Rng + ?Sized>(
    sampler: &ReturnSampler,
    rng: &mut R,
    start_balance: f64,
    withdrawal: f64,
    horizon: usize,
    n_paths: usize,
) -> f64 {
    let matrix = sampler.sample_matrix(rng, horizon, n_paths);
    let mut schedule = FixedWithdrawal(withdrawal);
    let survivors = (0..n_paths)
        .filter(|&path| {
            walk(
                start_balance,
                horizon,
                &mut schedule,
                &mut matrix.column(path),
                |_| {},
            )
            .survived()
        })
        .count();

    100.0 * survivors as f64 / n_paths as f64
}

/// Shared progress counters for an ensemble run
#[derive(Debug, Clone, Default)]
pub struct EnsembleProgress {
    completed: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
}

impl EnsembleProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths finished so far (including failed ones)
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    /// Paths not started yet are skipped; running paths finish normally
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Run the full ensemble: one initial calibration, then every outer path in parallel
pub fn run_ensemble(config: &SimulationConfig) -> Result<EnsembleResult, SimulationError> {
    run_ensemble_with_progress(config, None)
}

pub fn run_ensemble_with_progress(
    config: &SimulationConfig,
    progress: Option<&EnsembleProgress>,
) -> Result<EnsembleResult, SimulationError> {
    config.validate()?;
    let sampler = ReturnSampler::new(&config.market)?;
    let base_seed = config.seed.base_seed();

    info!(
        base_seed,
        outer_paths = config.outer_paths,
        horizon_years = config.horizon_years,
        "starting ensemble"
    );

    let initial_calibration = initial_withdrawal(config, &sampler, base_seed)?;
    let policy = DynamicWithdrawalPolicy::from_config(config, sampler.clone())?;

    let indices: Vec<usize> = (0..config.outer_paths).collect();
    let outcomes = execute_paths(&indices, base_seed, progress, |seed| {
        run_outer_path(config, &policy, &sampler, seed, initial_calibration.value)
    })
    .into_iter()
    .map(|(_, outcome)| outcome)
    .collect();

    let result = EnsembleResult {
        base_seed,
        initial_calibration,
        outcomes,
    };

    let failed = result.failed_indices();
    if !failed.is_empty() {
        warn!(failed = failed.len(), "some paths did not complete");
    }
    info!(
        completed = result.completed_count(),
        success_rate = result.success_rate(),
        "ensemble finished"
    );

    Ok(result)
}

/// Re-run only the failed or cancelled paths of `result`, in place
///
/// Each path reuses its original derived seed, so a resumed ensemble matches
/// an uninterrupted one. Returns how many paths were re-run.
pub fn rerun_failed(
    config: &SimulationConfig,
    result: &mut EnsembleResult,
    progress: Option<&EnsembleProgress>,
) -> Result<usize, SimulationError> {
    config.validate()?;
    if result.outcomes.len() != config.outer_paths {
        return Err(ConfigError::InvalidValue {
            field: "outer_paths",
            value: config.outer_paths as f64,
            reason: "does not match the ensemble being resumed",
        }
        .into());
    }

    let sampler = ReturnSampler::new(&config.market)?;
    let policy = DynamicWithdrawalPolicy::from_config(config, sampler.clone())?;
    let initial = result.initial_withdrawal();
    let failed = result.failed_indices();

    info!(paths = failed.len(), "re-running failed paths");

    let rerun = execute_paths(&failed, result.base_seed, progress, |seed| {
        run_outer_path(config, &policy, &sampler, seed, initial)
    });
    for (index, outcome) in rerun {
        result.outcomes[index] = outcome;
    }

    Ok(failed.len())
}

fn initial_withdrawal(
    config: &SimulationConfig,
    sampler: &ReturnSampler,
    base_seed: u64,
) -> Result<CalibrationResult, ConfigError> {
    let mut rng = SmallRng::seed_from_u64(base_seed);
    let calibration = calibrate_initial_withdrawal(
        sampler,
        &mut rng,
        config.starting_balance,
        config.horizon_years,
        config.calibration_paths,
        config.target_success_rate,
        &config.initial_calibration,
    )?;

    if calibration.converged {
        info!(
            withdrawal = calibration.value,
            success_rate = calibration.success_rate,
            "initial withdrawal calibrated"
        );
    } else {
        warn!(
            withdrawal = calibration.value,
            success_rate = calibration.success_rate,
            iterations = calibration.iterations,
            "initial withdrawal did not converge, using last midpoint"
        );
    }

    Ok(calibration)
}

/// One outer path: sampled returns with the dynamic policy attached
fn run_outer_path(
    config: &SimulationConfig,
    policy: &DynamicWithdrawalPolicy,
    sampler: &ReturnSampler,
    seed: u64,
    initial_withdrawal: f64,
) -> PathResult {
    let mut rng = SmallRng::seed_from_u64(seed);
    let policy_rng = SmallRng::seed_from_u64(rng.next_u64());

    let mut schedule = policy.schedule(initial_withdrawal, policy_rng);
    let mut returns = SampledReturns::new(sampler, &mut rng);
    let mut result = simulate_path(
        config.starting_balance,
        config.horizon_years,
        &mut schedule,
        &mut returns,
    );
    result.metrics = schedule.metrics();
    result
}

/// Fan the given path indices out over the worker pool, isolating panics per path
///
/// Output pairs each index with its outcome, in input order.
fn execute_paths<F>(
    indices: &[usize],
    base_seed: u64,
    progress: Option<&EnsembleProgress>,
    run_path: F,
) -> Vec<(usize, PathOutcome)>
where
    F: Fn(u64) -> PathResult + Sync,
{
    let run_one = |index: usize| -> (usize, PathOutcome) {
        if progress.is_some_and(EnsembleProgress::is_cancelled) {
            return (index, Err(PathFailure::Cancelled));
        }

        let seed = path_seed(base_seed, index);
        let outcome = catch_unwind(AssertUnwindSafe(|| run_path(seed))).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(index, seed, %message, "path panicked");
            PathFailure::Panicked { message }
        });

        if let Some(progress) = progress {
            progress.increment();
        }
        (index, outcome)
    };

    #[cfg(feature = "parallel")]
    let outcomes = indices.par_iter().map(|&index| run_one(index)).collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes = indices.iter().map(|&index| run_one(index)).collect();

    outcomes
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MarketModel;

    #[test]
    fn test_withdraw_then_grow_ordering() {
        let returns = [0.10, 0.10];
        let result = simulate_path(1_000.0, 2, &mut FixedWithdrawal(100.0), &mut &returns[..]);

        let first = result.years[0];
        assert_eq!(first.post_withdrawal_balance, 900.0);
        assert!((first.ending_balance - 990.0).abs() < 1e-9);

        let second = result.years[1];
        assert!((second.beginning_balance - 990.0).abs() < 1e-9);
        assert!((second.ending_balance - 979.0).abs() < 1e-9);
        assert!(!result.depleted);
        assert!((result.cagr - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_depletion_records_partial_withdrawal_and_stops() {
        let returns = [0.0; 5];
        let result = simulate_path(250.0, 5, &mut FixedWithdrawal(100.0), &mut &returns[..]);

        assert!(result.depleted);
        assert_eq!(result.years.len(), 3);
        let last = result.years[2];
        assert_eq!(last.beginning_balance, 50.0);
        assert_eq!(last.withdrawal, 50.0);
        assert_eq!(last.ending_balance, 0.0);
        assert_eq!(last.applied_return, 0.0);
        // Two realized years at 0% growth
        assert_eq!(result.cagr, 0.0);
    }

    #[test]
    fn test_immediate_depletion_has_zero_cagr() {
        let returns = [0.5; 3];
        let result = simulate_path(1_000.0, 3, &mut FixedWithdrawal(1_000.0), &mut &returns[..]);

        assert!(result.depleted);
        assert_eq!(result.years.len(), 1);
        assert_eq!(result.cagr, 0.0);
    }

    #[test]
    fn test_total_loss_clamps_to_zero() {
        let returns = [-1.5, 0.2];
        let result = simulate_path(1_000.0, 2, &mut FixedWithdrawal(0.0), &mut &returns[..]);

        assert!(result.depleted);
        assert_eq!(result.years.len(), 1);
        assert_eq!(result.ending_balance(), 0.0);
        assert_eq!(result.cagr, -1.0);
    }

    #[test]
    fn test_closure_schedule_sees_balance_and_years_remaining() {
        let returns = [0.0; 3];
        let mut seen = Vec::new();
        let mut schedule = |balance: f64, years_remaining: usize| {
            seen.push((balance, years_remaining));
            balance / years_remaining as f64
        };
        let result = simulate_path(300.0, 3, &mut schedule, &mut &returns[..]);

        assert_eq!(seen, vec![(300.0, 3), (200.0, 2), (100.0, 1)]);
        // The last year withdraws everything, which counts as depletion
        assert!(result.depleted);
        assert_eq!(result.years.len(), 3);
    }

    #[test]
    fn test_estimate_extremes() {
        let sampler = ReturnSampler::new(&MarketModel::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(11);

        assert_eq!(
            estimate_success_rate(&sampler, &mut rng, 1_000_000.0, 0.0, 30, 500),
            Ok(100.0)
        );
        assert_eq!(
            estimate_success_rate(&sampler, &mut rng, 1_000_000.0, 1_000_000.0, 30, 500),
            Ok(0.0)
        );
        assert_eq!(
            estimate_success_rate(&sampler, &mut rng, 1_000_000.0, 2_000_000.0, 1, 500),
            Ok(0.0)
        );
    }

    #[test]
    fn test_estimate_rejects_zero_paths() {
        let sampler = ReturnSampler::new(&MarketModel::default()).unwrap();
        let mut rng = SmallRng::seed_from_u64(11);

        assert_eq!(
            estimate_success_rate(&sampler, &mut rng, 1_000.0, 10.0, 5, 0),
            Err(ConfigError::NonPositive { field: "n_paths" })
        );
    }

    #[test]
    fn test_execute_paths_isolates_panics() {
        let indices: Vec<usize> = (0..6).collect();
        let outcomes = execute_paths(&indices, 100, None, |seed| {
            if seed == path_seed(100, 3) {
                panic!("boom");
            }
            PathResult {
                years: vec![],
                cagr: seed as f64,
                depleted: false,
                metrics: PathMetrics::default(),
            }
        });

        assert_eq!(outcomes.len(), 6);
        for (position, (index, outcome)) in outcomes.iter().enumerate() {
            assert_eq!(position, *index);
            if *index == 3 {
                assert_eq!(
                    outcome,
                    &Err(PathFailure::Panicked {
                        message: "boom".to_string()
                    })
                );
            } else {
                let path = outcome.as_ref().unwrap();
                assert_eq!(path.cagr, path_seed(100, *index) as f64);
            }
        }
    }

    #[test]
    fn test_cancelled_progress_skips_paths() {
        let progress = EnsembleProgress::new();
        progress.cancel();

        let outcomes = execute_paths(&[0, 1, 2], 0, Some(&progress), |_| {
            unreachable!("cancelled paths never start")
        });

        assert!(
            outcomes
                .iter()
                .all(|(_, outcome)| outcome == &Err(PathFailure::Cancelled))
        );
        assert_eq!(progress.completed(), 0);
    }
}
