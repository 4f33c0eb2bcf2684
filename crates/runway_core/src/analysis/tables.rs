//! Per-path annual tables and the assembled ensemble report

use serde::{Deserialize, Serialize};

use crate::error::AggregateError;
use crate::metrics::EnsembleMetrics;
use crate::model::{EnsembleResult, PathResult, YearRecord};
use crate::optimization::CalibrationResult;

use super::summary::{OutcomeSummary, summarize};

/// One row of an annual table
///
/// `values` holds one entry per simulated year, so depleted paths have
/// shorter rows than the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualRow {
    pub path: usize,
    pub average: f64,
    pub values: Vec<f64>,
}

/// Annual values per completed path, keyed by original path index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualTable {
    pub horizon: usize,
    pub rows: Vec<AnnualRow>,
}

impl AnnualTable {
    fn from_ensemble<F>(result: &EnsembleResult, value: F) -> Self
    where
        F: Fn(&YearRecord) -> f64,
    {
        let mut horizon = 0;
        let rows = result
            .outcomes
            .iter()
            .enumerate()
            .filter_map(|(path, outcome)| outcome.as_ref().ok().map(|p| (path, p)))
            .map(|(path, p)| {
                let values: Vec<f64> = p.years.iter().map(&value).collect();
                horizon = horizon.max(values.len());
                let average = if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };
                AnnualRow {
                    path,
                    average,
                    values,
                }
            })
            .collect();
        Self { horizon, rows }
    }
}

/// Applied return of every simulated year, per path
#[must_use]
pub fn annual_returns(result: &EnsembleResult) -> AnnualTable {
    AnnualTable::from_ensemble(result, |y| y.applied_return)
}

/// Withdrawal of every simulated year, per path; `average` is the path's mean withdrawal
#[must_use]
pub fn annual_withdrawals(result: &EnsembleResult) -> AnnualTable {
    AnnualTable::from_ensemble(result, |y| y.withdrawal)
}

/// Year-by-year trace of one completed path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTrace {
    pub path: usize,
    pub cagr: f64,
    pub depleted: bool,
    pub years: Vec<YearRecord>,
}

impl PathTrace {
    fn new(path: usize, result: &PathResult) -> Self {
        Self {
            path,
            cagr: result.cagr,
            depleted: result.depleted,
            years: result.years.clone(),
        }
    }
}

/// Everything a report writer needs, as plain serializable records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleReport {
    pub base_seed: u64,
    pub initial_calibration: CalibrationResult,
    pub summary: OutcomeSummary,
    pub annual_returns: AnnualTable,
    pub annual_withdrawals: AnnualTable,
    pub traces: Vec<PathTrace>,
    pub failed_paths: Vec<usize>,
    pub metrics: EnsembleMetrics,
}

impl EnsembleReport {
    /// Assemble the report, applying the same completion threshold as `summarize`
    pub fn build(result: &EnsembleResult, min_completed: usize) -> Result<Self, AggregateError> {
        let summary = summarize(result, min_completed)?;
        let traces = result
            .outcomes
            .iter()
            .enumerate()
            .filter_map(|(path, outcome)| outcome.as_ref().ok().map(|p| PathTrace::new(path, p)))
            .collect();

        Ok(Self {
            base_seed: result.base_seed,
            initial_calibration: result.initial_calibration.clone(),
            summary,
            annual_returns: annual_returns(result),
            annual_withdrawals: annual_withdrawals(result),
            traces,
            failed_paths: result.failed_indices(),
            metrics: result.metrics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PathMetrics;
    use crate::model::PathFailure;
    use crate::optimization::TerminationReason;

    fn record(year: usize, withdrawal: f64, applied_return: f64) -> YearRecord {
        YearRecord {
            year,
            beginning_balance: 1_000.0,
            withdrawal,
            post_withdrawal_balance: 1_000.0 - withdrawal,
            applied_return,
            ending_balance: 1_000.0,
        }
    }

    fn ensemble() -> EnsembleResult {
        let full = PathResult {
            years: vec![record(1, 40.0, 0.05), record(2, 60.0, -0.02)],
            cagr: 0.015,
            depleted: false,
            metrics: PathMetrics {
                success_rate_estimates: 3,
                recalibrations: 1,
                unconverged_recalibrations: 0,
            },
        };
        let short = PathResult {
            years: vec![record(1, 30.0, 0.01)],
            cagr: 0.01,
            depleted: false,
            metrics: PathMetrics::default(),
        };
        EnsembleResult {
            base_seed: 77,
            initial_calibration: CalibrationResult {
                value: 40.0,
                success_rate: 85.2,
                converged: true,
                termination_reason: TerminationReason::Accepted,
                iterations: 4,
                steps: vec![],
            },
            outcomes: vec![Ok(full), Err(PathFailure::Cancelled), Ok(short)],
        }
    }

    #[test]
    fn test_annual_tables_keep_path_indices() {
        let result = ensemble();
        let withdrawals = annual_withdrawals(&result);

        assert_eq!(withdrawals.horizon, 2);
        assert_eq!(withdrawals.rows.len(), 2);
        assert_eq!(withdrawals.rows[0].path, 0);
        assert_eq!(withdrawals.rows[0].average, 50.0);
        assert_eq!(withdrawals.rows[1].path, 2);
        assert_eq!(withdrawals.rows[1].values, vec![30.0]);

        let returns = annual_returns(&result);
        assert_eq!(returns.rows[0].values, vec![0.05, -0.02]);
    }

    #[test]
    fn test_report_collects_failures_and_metrics() {
        let report = EnsembleReport::build(&ensemble(), 2).unwrap();

        assert_eq!(report.base_seed, 77);
        assert_eq!(report.failed_paths, vec![1]);
        assert_eq!(report.traces.len(), 2);
        assert_eq!(report.traces[1].path, 2);
        assert_eq!(report.metrics.paths, 2);
        assert_eq!(report.metrics.recalibrations, 1);
        assert_eq!(report.summary.paths, 2);

        assert!(EnsembleReport::build(&ensemble(), 3).is_err());
    }
}
