//! Simulation results
//!
//! Year-by-year traces, per-path results and the collected ensemble output.

use serde::{Deserialize, Serialize};

use crate::metrics::{EnsembleMetrics, PathMetrics};
use crate::optimization::CalibrationResult;

/// Immutable snapshot of one simulated year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    /// One-based year index
    pub year: usize,
    pub beginning_balance: f64,
    /// Amount actually deducted (the remaining balance in a depletion year)
    pub withdrawal: f64,
    pub post_withdrawal_balance: f64,
    /// Return applied this year, zero if depletion happened before growth
    pub applied_return: f64,
    pub ending_balance: f64,
}

/// Complete result of one simulated path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Year records in order; shorter than the horizon when depleted
    pub years: Vec<YearRecord>,
    /// Compound annual growth rate of the returns actually applied
    pub cagr: f64,
    pub depleted: bool,
    #[serde(default)]
    pub metrics: PathMetrics,
}

impl PathResult {
    /// Balance at the end of the last simulated year
    #[must_use]
    pub fn ending_balance(&self) -> f64 {
        self.years.last().map_or(0.0, |y| y.ending_balance)
    }

    #[must_use]
    pub fn survived(&self) -> bool {
        !self.depleted && self.ending_balance() > 0.0
    }

    /// Mean of the recorded annual withdrawals, 0 for an empty trace
    #[must_use]
    pub fn mean_withdrawal(&self) -> f64 {
        if self.years.is_empty() {
            return 0.0;
        }
        self.years.iter().map(|y| y.withdrawal).sum::<f64>() / self.years.len() as f64
    }

    pub fn withdrawals(&self) -> impl Iterator<Item = f64> + '_ {
        self.years.iter().map(|y| y.withdrawal)
    }

    pub fn returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.years.iter().map(|y| y.applied_return)
    }
}

/// Why an outer path produced no result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathFailure {
    /// Cancellation was requested before the path started
    Cancelled,
    /// The worker running the path panicked
    Panicked { message: String },
}

impl std::fmt::Display for PathFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathFailure::Cancelled => write!(f, "cancelled"),
            PathFailure::Panicked { message } => write!(f, "panicked: {message}"),
        }
    }
}

pub type PathOutcome = Result<PathResult, PathFailure>;

/// Results from a full ensemble run, ordered by path index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Base seed every path seed was derived from
    pub base_seed: u64,
    /// Calibration that produced the shared year-1 withdrawal
    pub initial_calibration: CalibrationResult,
    pub outcomes: Vec<PathOutcome>,
}

impl EnsembleResult {
    #[must_use]
    pub fn initial_withdrawal(&self) -> f64 {
        self.initial_calibration.value
    }

    /// Completed paths in index order
    pub fn completed(&self) -> impl Iterator<Item = &PathResult> + Clone {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    /// Indices of paths that failed or were cancelled
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_err())
            .map(|(i, _)| i)
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(Result::is_ok)
    }

    /// Percentage of completed paths that survived the full horizon
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let completed = self.completed_count();
        if completed == 0 {
            return 0.0;
        }
        let survived = self.completed().filter(|p| p.survived()).count();
        100.0 * survived as f64 / completed as f64
    }

    #[must_use]
    pub fn metrics(&self) -> EnsembleMetrics {
        EnsembleMetrics::from_paths(self.completed().map(|p| &p.metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: usize, withdrawal: f64, ending_balance: f64) -> YearRecord {
        YearRecord {
            year,
            beginning_balance: 0.0,
            withdrawal,
            post_withdrawal_balance: 0.0,
            applied_return: 0.0,
            ending_balance,
        }
    }

    #[test]
    fn test_mean_withdrawal_over_recorded_years() {
        let path = PathResult {
            years: vec![record(1, 40.0, 100.0), record(2, 50.0, 60.0), record(3, 60.0, 10.0)],
            cagr: 0.0,
            depleted: false,
            metrics: PathMetrics::default(),
        };
        assert_eq!(path.mean_withdrawal(), 50.0);
        assert_eq!(path.ending_balance(), 10.0);
        assert!(path.survived());
    }

    #[test]
    fn test_empty_path_defaults() {
        let path = PathResult {
            years: vec![],
            cagr: 0.0,
            depleted: true,
            metrics: PathMetrics::default(),
        };
        assert_eq!(path.mean_withdrawal(), 0.0);
        assert_eq!(path.ending_balance(), 0.0);
        assert!(!path.survived());
    }
}
