//! Calibration result types

use serde::{Deserialize, Serialize};

/// One midpoint evaluated during a calibration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStep {
    pub iteration: usize,
    pub value: f64,
    pub rate: f64,
    /// Whether the rate fell within the tolerance band of the target
    pub accepted: bool,
}

/// Reason why a calibration terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// A midpoint landed within the tolerance band and early exit was enabled
    Accepted,

    /// The search bracket shrank below the tolerance
    BoundsCollapsed,

    /// The iteration cap was hit
    MaxIterationsReached,
}

/// Final result of a calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Mean of accepted midpoints, or the last midpoint when none was accepted
    pub value: f64,

    /// Mean rate at the accepted midpoints, or the rate at the last midpoint
    pub success_rate: f64,

    /// At least one midpoint fell within the tolerance band
    pub converged: bool,

    pub termination_reason: TerminationReason,

    pub iterations: usize,

    /// Every evaluated midpoint, in order
    pub steps: Vec<CalibrationStep>,
}

impl CalibrationResult {
    /// Midpoints that fell within the tolerance band
    pub fn accepted_steps(&self) -> impl Iterator<Item = &CalibrationStep> {
        self.steps.iter().filter(|s| s.accepted)
    }
}
