//! Outcome aggregation over completed paths

use serde::{Deserialize, Serialize};

use crate::error::AggregateError;
use crate::model::{EnsembleResult, PathResult};

use super::percentiles::PercentileTable;

/// Percentile tables over an ensemble's completed paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Path CAGR in percent
    pub cagr_percentiles: PercentileTable,
    /// Mean annual withdrawal of each path
    pub withdrawal_percentiles: PercentileTable,
    pub paths: usize,
    /// Percentage of summarized paths that survived the horizon
    pub success_rate: f64,
}

/// Summarize a set of path results
///
/// Pure function of its input; fails only on an empty set.
pub fn summarize_paths<'a, I>(paths: I) -> Result<OutcomeSummary, AggregateError>
where
    I: IntoIterator<Item = &'a PathResult>,
    I::IntoIter: Clone,
{
    let paths = paths.into_iter();
    let count = paths.clone().count();

    let cagr_percentiles = PercentileTable::from_values(paths.clone().map(|p| p.cagr))
        .ok_or(AggregateError::Empty)?
        .scaled(100.0);
    let withdrawal_percentiles =
        PercentileTable::from_values(paths.clone().map(PathResult::mean_withdrawal))
            .ok_or(AggregateError::Empty)?;
    let survived = paths.filter(|p| p.survived()).count();

    Ok(OutcomeSummary {
        cagr_percentiles,
        withdrawal_percentiles,
        paths: count,
        success_rate: 100.0 * survived as f64 / count as f64,
    })
}

/// Summarize an ensemble, refusing when fewer than `min_completed` paths finished
pub fn summarize(
    result: &EnsembleResult,
    min_completed: usize,
) -> Result<OutcomeSummary, AggregateError> {
    let completed = result.completed_count();
    if completed == 0 {
        return Err(AggregateError::Empty);
    }
    if completed < min_completed {
        return Err(AggregateError::InsufficientCompletion {
            completed,
            missing: result.outcomes.len() - completed,
            required: min_completed,
        });
    }

    summarize_paths(result.completed())
}
