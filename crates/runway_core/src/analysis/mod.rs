//! Outcome aggregation and report tables
//!
//! Everything here is a pure function of collected results, apart from
//! `market_cagr_percentiles` which samples its own returns.
//!
//! ```ignore
//! use runway_core::analysis::{EnsembleReport, summarize};
//!
//! let result = run_ensemble(&config)?;
//! let summary = summarize(&result, config.min_completed_paths())?;
//! println!("Median CAGR: {:.2}%", summary.cagr_percentiles.median().unwrap_or(0.0));
//!
//! let report = EnsembleReport::build(&result, config.min_completed_paths())?;
//! ```

mod percentiles;
mod summary;
mod tables;

pub use percentiles::{PercentileRow, PercentileTable, percentile};
pub use summary::{OutcomeSummary, summarize, summarize_paths};
pub use tables::{
    AnnualRow, AnnualTable, EnsembleReport, PathTrace, annual_returns, annual_withdrawals,
};

use rand::Rng;

use crate::error::AggregateError;
use crate::model::ReturnSampler;
use crate::simulation::{FixedWithdrawal, simulate_path};

/// CAGR percentiles (in percent) of compounded returns with no withdrawals
///
/// Each of the `n_paths` paths compounds a unit balance over `horizon` years
/// of sampled returns.
pub fn market_cagr_percentiles<R: Rng + ?Sized>(
    sampler: &ReturnSampler,
    horizon: usize,
    n_paths: usize,
    rng: &mut R,
) -> Result<PercentileTable, AggregateError> {
    let matrix = sampler.sample_matrix(rng, horizon, n_paths);
    let cagrs = (0..n_paths).map(|path| {
        simulate_path(1.0, horizon, &mut FixedWithdrawal(0.0), &mut matrix.column(path)).cagr
    });

    PercentileTable::from_values(cagrs)
        .map(|table| table.scaled(100.0))
        .ok_or(AggregateError::Empty)
}
