//! Scenario tests for the withdrawal simulation engine
//!
//! Tests are organized by topic:
//! - `path_properties` - Balance and trace invariants of the path simulator
//! - `estimator` - Success-rate estimation extremes and monotonicity
//! - `calibration` - End-to-end initial withdrawal calibration
//! - `ensemble` - Determinism, ordering and resumption of ensemble runs
//! - `aggregate` - Completion threshold and percentile tables over ensembles

mod ensemble;
mod estimator;

use crate::config::{SimulationBuilder, SimulationConfig};
use crate::optimization::CalibrationConfig;

/// Small but complete ensemble configuration for scenario tests
fn small_config(seed: u64) -> SimulationConfig {
    SimulationBuilder::new()
        .years(10)
        .outer_paths(8)
        .calibration_paths(500)
        .inner_paths(50)
        .initial_calibration(CalibrationConfig::default())
        .yearly_calibration(CalibrationConfig::yearly().with_max_iterations(6))
        .seed(seed)
        .build()
        .unwrap()
}
