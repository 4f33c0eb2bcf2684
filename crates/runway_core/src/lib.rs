//! Monte Carlo retirement withdrawal simulation library
//!
//! This crate estimates how long a portfolio lasts under random annual returns
//! while the yearly withdrawal adapts to a target success rate. It provides:
//! - Normal return sampling around the real (after fee and inflation) mean
//! - A withdraw-then-grow path simulator with explicit depletion handling
//! - Monte Carlo success-rate estimation
//! - Bisection calibration of withdrawals and starting balances
//! - A dynamic withdrawal policy that re-solves when the success rate drifts
//! - A parallel, seed-reproducible ensemble runner with per-path failure isolation
//! - Percentile tables and report records over the collected paths
//!
//! # Builder DSL
//!
//! ```ignore
//! use runway_core::{SimulationBuilder, run_ensemble, analysis::summarize};
//!
//! let config = SimulationBuilder::new()
//!     .starting_balance(1_000_000.0)
//!     .years(30)
//!     .outer_paths(500)
//!     .target(85.0)
//!     .seed(42)
//!     .build()?;
//!
//! let result = run_ensemble(&config)?;
//! let summary = summarize(&result, config.min_completed_paths())?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod error;
pub mod metrics;
pub mod optimization;
pub mod policy;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{SeedStrategy, SimulationBuilder, SimulationConfig};
pub use error::{AggregateError, ConfigError, MarketError, Result, SimulationError};
pub use model::{EnsembleResult, MarketModel, PathFailure, PathResult, ReturnSampler, YearRecord};
pub use policy::DynamicWithdrawalPolicy;
pub use simulation::{
    EnsembleProgress, FixedWithdrawal, WithdrawalSchedule, estimate_success_rate, rerun_failed,
    run_ensemble, run_ensemble_with_progress, simulate_path,
};
