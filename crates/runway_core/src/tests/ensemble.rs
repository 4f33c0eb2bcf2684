//! Ensemble determinism, ordering and resumption

use crate::config::{SeedStrategy, path_seed};
use crate::model::PathFailure;
use crate::simulation::{EnsembleProgress, rerun_failed, run_ensemble, run_ensemble_with_progress};

use super::small_config;

#[test]
fn test_fixed_seed_is_bit_identical() {
    let config = small_config(42);
    let first = run_ensemble(&config).unwrap();
    let second = run_ensemble(&config).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.base_seed, 42);
    assert_eq!(first.outcomes.len(), config.outer_paths);
    assert!(first.is_complete());
}

#[test]
fn test_different_seeds_differ() {
    let a = run_ensemble(&small_config(1)).unwrap();
    let b = run_ensemble(&small_config(2)).unwrap();
    assert_ne!(a.outcomes, b.outcomes);
}

#[test]
fn test_entropy_seed_is_recorded_and_replayable() {
    let mut config = small_config(0);
    config.seed = SeedStrategy::Entropy;
    let first = run_ensemble(&config).unwrap();

    config.seed = SeedStrategy::Fixed(first.base_seed);
    let replay = run_ensemble(&config).unwrap();
    assert_eq!(first, replay);
}

#[test]
fn test_paths_share_initial_withdrawal() {
    let config = small_config(7);
    let result = run_ensemble(&config).unwrap();
    let initial = result.initial_withdrawal();

    assert!(initial > 0.0 && initial < config.starting_balance);
    for path in result.completed() {
        assert_eq!(path.years[0].withdrawal, initial);
        assert!(path.years.len() <= config.horizon_years);
    }
}

#[test]
fn test_dynamic_policy_is_exercised() {
    let result = run_ensemble(&small_config(11)).unwrap();
    let metrics = result.metrics();

    assert_eq!(metrics.paths, 8);
    // Every path checks its success rate at least once after year one
    assert!(metrics.success_rate_estimates >= 8);
    assert!(metrics.recalibrations <= metrics.success_rate_estimates);
}

#[test]
fn test_cancelled_run_resumes_to_uninterrupted_result() {
    let config = small_config(99);
    let uninterrupted = run_ensemble(&config).unwrap();

    let progress = EnsembleProgress::new();
    progress.cancel();
    let mut resumed = run_ensemble_with_progress(&config, Some(&progress)).unwrap();
    assert_eq!(resumed.completed_count(), 0);
    assert!(
        resumed
            .outcomes
            .iter()
            .all(|o| o == &Err(PathFailure::Cancelled))
    );

    // Simulate a partial run by keeping some finished paths
    for index in [0, 3, 5] {
        resumed.outcomes[index] = uninterrupted.outcomes[index].clone();
    }
    assert_eq!(resumed.failed_indices(), vec![1, 2, 4, 6, 7]);

    let fresh = EnsembleProgress::new();
    let rerun = rerun_failed(&config, &mut resumed, Some(&fresh)).unwrap();

    assert_eq!(rerun, 5);
    assert_eq!(fresh.completed(), 5);
    assert_eq!(resumed, uninterrupted);
}

#[test]
fn test_rerun_rejects_mismatched_config() {
    let config = small_config(3);
    let mut result = run_ensemble(&config).unwrap();

    let mut other = config.clone();
    other.outer_paths = 9;
    assert!(rerun_failed(&other, &mut result, None).is_err());
}

#[test]
fn test_progress_counts_every_path() {
    let config = small_config(5);
    let progress = EnsembleProgress::new();
    let result = run_ensemble_with_progress(&config, Some(&progress)).unwrap();

    assert_eq!(progress.completed(), config.outer_paths);
    assert!(result.is_complete());
    assert_ne!(path_seed(result.base_seed, 0), path_seed(result.base_seed, 1));
}
