//! Calibration workload counters
//!
//! The per-year recalibration loop dominates the cost of an ensemble run.
//! These counters make that cost visible per path and across the ensemble.

use serde::{Deserialize, Serialize};

/// Counters collected while simulating one outer path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMetrics {
    /// Inner success-rate estimates run (threshold checks and search steps)
    pub success_rate_estimates: u64,
    /// Years in which the withdrawal was re-solved
    pub recalibrations: u64,
    /// Re-solves that exhausted their iteration budget without acceptance
    pub unconverged_recalibrations: u64,
}

impl PathMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_estimates(&mut self, count: u64) {
        self.success_rate_estimates += count;
    }

    pub fn record_recalibration(&mut self, converged: bool) {
        self.recalibrations += 1;
        if !converged {
            self.unconverged_recalibrations += 1;
        }
    }
}

/// Totals over all completed paths of an ensemble
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMetrics {
    pub paths: usize,
    pub success_rate_estimates: u64,
    pub recalibrations: u64,
    pub unconverged_recalibrations: u64,
    pub max_recalibrations_per_path: u64,
}

impl EnsembleMetrics {
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a PathMetrics>) -> Self {
        paths.into_iter().fold(Self::default(), |mut acc, m| {
            acc.paths += 1;
            acc.success_rate_estimates += m.success_rate_estimates;
            acc.recalibrations += m.recalibrations;
            acc.unconverged_recalibrations += m.unconverged_recalibrations;
            acc.max_recalibrations_per_path = acc.max_recalibrations_per_path.max(m.recalibrations);
            acc
        })
    }

    /// Average recalibrations per completed path
    #[must_use]
    pub fn avg_recalibrations(&self) -> f64 {
        if self.paths == 0 {
            0.0
        } else {
            self.recalibrations as f64 / self.paths as f64
        }
    }
}
