use std::time::Duration;

use thiserror::Error;

/// Errors raised by the simulation core
///
/// Validation errors (unknown names, invalid parameters, invalid configuration) are returned
/// before any integration starts. Runtime errors (`Integration`, `Timeout`, `NonFinite`) are
/// scoped to a single scenario and stored in the [crate::routines::runner::Simulation]
/// next to the successful trajectories.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("Unknown scenario '{name}', available scenarios are: {}", .available.join(", "))]
    UnknownScenario {
        name: String,
        available: Vec<String>,
    },
    #[error("No scenarios were selected")]
    EmptySelection,
    #[error("Scenario '{name}' is defined more than once")]
    DuplicateScenario { name: String },
    #[error("Invalid parameters for scenario '{scenario}': {reason}")]
    InvalidParameters { scenario: String, reason: String },
    #[error("Invalid simulation configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Integration of scenario '{scenario}' failed: {reason}")]
    Integration { scenario: String, reason: String },
    #[error("Integration of scenario '{scenario}' exceeded {limit:.2?} and stopped at t = {time}")]
    Timeout {
        scenario: String,
        limit: Duration,
        time: f64,
    },
    #[error("Scenario '{scenario}' produced a non-finite state at t = {time}")]
    NonFinite { scenario: String, time: f64 },
}

impl SimulationError {
    /// Returns true for errors that only affect a single scenario of a batch
    pub fn is_scenario_failure(&self) -> bool {
        matches!(
            self,
            SimulationError::Integration { .. }
                | SimulationError::Timeout { .. }
                | SimulationError::NonFinite { .. }
        )
    }
}
