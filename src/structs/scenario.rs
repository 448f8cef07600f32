use serde_derive::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::simulator::{ModelParameters, NSTATES};

/// Parameters that distinguish one therapy scenario from another
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// Treatment sensitivity of each subpopulation, in [0, 1]
    pub mu: [f64; NSTATES],
    /// Treatment intensity, in [0, 1]; zero means no therapy
    pub epsilon: f64,
    /// Plasticity factor scaling the base transition matrix, non-negative
    pub transition: f64,
}

impl ScenarioParameters {
    pub fn new(mu: [f64; NSTATES], epsilon: f64, transition: f64) -> Self {
        ScenarioParameters {
            mu,
            epsilon,
            transition,
        }
    }

    /// Check the parameter ranges
    pub fn validate(&self) -> Result<(), String> {
        for (i, &mu) in self.mu.iter().enumerate() {
            if !(0.0..=1.0).contains(&mu) {
                return Err(format!("mu[{}] must lie in [0, 1], got {}", i, mu));
            }
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(format!("epsilon must lie in [0, 1], got {}", self.epsilon));
        }
        if !self.transition.is_finite() || self.transition < 0.0 {
            return Err(format!(
                "transition must be finite and non-negative, got {}",
                self.transition
            ));
        }
        Ok(())
    }

    /// The bundle handed to the model, with the transition matrix already scaled
    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters::from(self)
    }
}

/// A named parameter bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub parameters: ScenarioParameters,
}

impl Scenario {
    pub fn new(name: impl Into<String>, mu: [f64; NSTATES], epsilon: f64, transition: f64) -> Self {
        Scenario {
            name: name.into(),
            parameters: ScenarioParameters::new(mu, epsilon, transition),
        }
    }
}

/// Immutable, validated, ordered collection of scenarios
///
/// Names are unique. Lookups by name never fall back to a default entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTable {
    scenarios: Vec<Scenario>,
}

impl ScenarioTable {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, SimulationError> {
        for (index, scenario) in scenarios.iter().enumerate() {
            if scenario.name.trim().is_empty() {
                return Err(SimulationError::InvalidParameters {
                    scenario: format!("#{}", index),
                    reason: "scenario names must not be empty".to_string(),
                });
            }
            if scenarios[..index].iter().any(|s| s.name == scenario.name) {
                return Err(SimulationError::DuplicateScenario {
                    name: scenario.name.clone(),
                });
            }
            scenario
                .parameters
                .validate()
                .map_err(|reason| SimulationError::InvalidParameters {
                    scenario: scenario.name.clone(),
                    reason,
                })?;
        }
        Ok(ScenarioTable { scenarios })
    }

    /// The seven predefined scenarios
    pub fn reference() -> Self {
        ScenarioTable {
            scenarios: vec![
                Scenario::new(
                    "Scenario 1: Sensitive + High therapy",
                    [0.9, 0.5, 0.1],
                    0.8,
                    1.0,
                ),
                Scenario::new(
                    "Scenario 2: Partially resistant + Medium therapy",
                    [0.7, 0.4, 0.2],
                    0.5,
                    1.0,
                ),
                Scenario::new(
                    "Scenario 3: High resistance + Low therapy",
                    [0.4, 0.3, 0.1],
                    0.3,
                    1.0,
                ),
                Scenario::new(
                    "Scenario 4: Adaptive mix + High plasticity",
                    [0.8, 0.5, 0.25],
                    0.6,
                    2.0,
                ),
                Scenario::new("Scenario 5: Experimental control", [0.6, 0.6, 0.6], 0.0, 0.0),
                Scenario::new(
                    "Scenario 6: Heterogeneous tumor + Sequential therapy",
                    [0.85, 0.6, 0.3],
                    0.9,
                    0.8,
                ),
                Scenario::new(
                    "Scenario 7: Slow adaptive tumor + Reduced plasticity",
                    [0.75, 0.45, 0.2],
                    0.4,
                    0.5,
                ),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Result<&Scenario, SimulationError> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SimulationError::UnknownScenario {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.scenarios.iter().map(|s| s.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Default for ScenarioTable {
    fn default() -> Self {
        ScenarioTable::reference()
    }
}
