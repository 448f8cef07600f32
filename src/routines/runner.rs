use std::time::Instant;

use rayon::prelude::*;

use crate::error::SimulationError;
use crate::simulator::ode::{simulate_scenario, SolverOptions};
use crate::simulator::{State, NSTATES};
use crate::structs::scenario::{Scenario, ScenarioTable};
use crate::structs::trajectory::Trajectory;

/// Initial conditions, horizon and solver settings shared by every scenario of a run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_state: [f64; NSTATES],
    pub t_max: f64,
    pub samples: usize,
    pub solver: SolverOptions,
    /// Integrate the selected scenarios on the rayon thread pool
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_state: [0.03, 0.015, 0.005],
            t_max: 300.0,
            samples: 300,
            solver: SolverOptions::default(),
            parallel: true,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |reason: String| Err(SimulationError::InvalidConfiguration(reason));
        if let Some(x) = self.initial_state.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
            return invalid(format!(
                "initial densities must be finite and strictly positive, got {}",
                x
            ));
        }
        if !(self.t_max.is_finite() && self.t_max > 0.0) {
            return invalid(format!("t_max must be positive, got {}", self.t_max));
        }
        if self.samples < 2 {
            return invalid(format!("at least 2 samples are needed, got {}", self.samples));
        }
        if !(self.solver.rtol > 0.0 && self.solver.atol > 0.0) {
            return invalid(format!(
                "solver tolerances must be positive, got rtol = {} and atol = {}",
                self.solver.rtol, self.solver.atol
            ));
        }
        Ok(())
    }
}

/// Outcome of one scenario in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    pub name: String,
    pub outcome: Result<Trajectory, SimulationError>,
}

impl ScenarioRun {
    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.outcome.as_ref().ok()
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Result of [Runner::run]: one [ScenarioRun] per selected scenario, in selection order
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    runs: Vec<ScenarioRun>,
}

impl Simulation {
    pub fn get(&self, name: &str) -> Option<&ScenarioRun> {
        self.runs.iter().find(|run| run.name == name)
    }

    /// Trajectory of a scenario, if it was selected and integrated successfully
    pub fn trajectory(&self, name: &str) -> Option<&Trajectory> {
        self.get(name).and_then(|run| run.trajectory())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioRun> {
        self.runs.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.runs.iter().map(|run| run.name.as_str()).collect()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &Trajectory)> {
        self.runs
            .iter()
            .filter_map(|run| run.trajectory().map(|t| (run.name.as_str(), t)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &SimulationError)> {
        self.runs
            .iter()
            .filter_map(|run| run.outcome.as_ref().err().map(|e| (run.name.as_str(), e)))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl IntoIterator for Simulation {
    type Item = ScenarioRun;
    type IntoIter = std::vec::IntoIter<ScenarioRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.into_iter()
    }
}

/// Integrates selected scenarios of a [ScenarioTable] under a shared [SimulationConfig]
#[derive(Debug, Clone)]
pub struct Runner {
    table: ScenarioTable,
    config: SimulationConfig,
}

impl Default for Runner {
    fn default() -> Self {
        Runner {
            table: ScenarioTable::reference(),
            config: SimulationConfig::default(),
        }
    }
}

impl Runner {
    pub fn new(table: ScenarioTable, config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Runner { table, config })
    }

    pub fn table(&self) -> &ScenarioTable {
        &self.table
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Resolve a selection against the table
    ///
    /// Fails on the first unknown name. Repeated names keep their first position.
    fn resolve<S: AsRef<str>>(&self, selected: &[S]) -> Result<Vec<&Scenario>, SimulationError> {
        if selected.is_empty() {
            return Err(SimulationError::EmptySelection);
        }
        let mut scenarios: Vec<&Scenario> = Vec::with_capacity(selected.len());
        for name in selected {
            let scenario = self.table.get(name.as_ref())?;
            if scenarios.iter().any(|s| s.name == scenario.name) {
                tracing::warn!("Scenario '{}' was selected more than once", scenario.name);
                continue;
            }
            scenarios.push(scenario);
        }
        Ok(scenarios)
    }

    /// Integrate every selected scenario
    ///
    /// Selection errors abort the call before any integration. Failures during integration
    /// are recorded on the affected [ScenarioRun] and do not stop the other scenarios.
    pub fn run<S: AsRef<str>>(&self, selected: &[S]) -> Result<Simulation, SimulationError> {
        let scenarios = self.resolve(selected)?;
        let now = Instant::now();
        tracing::info!(
            "Simulating {} scenario(s) over [0, {}] with {} samples",
            scenarios.len(),
            self.config.t_max,
            self.config.samples
        );

        let runs: Vec<ScenarioRun> = if self.config.parallel {
            scenarios
                .par_iter()
                .map(|scenario| self.simulate(scenario))
                .collect()
        } else {
            scenarios
                .iter()
                .map(|scenario| self.simulate(scenario))
                .collect()
        };

        for run in &runs {
            if let Err(err) = &run.outcome {
                tracing::error!("{}", err);
            }
        }
        tracing::info!(
            "Simulated {} scenario(s), {} failed, in {:.2?}",
            runs.len(),
            runs.iter().filter(|run| !run.is_success()).count(),
            now.elapsed()
        );

        Ok(Simulation { runs })
    }

    fn simulate(&self, scenario: &Scenario) -> ScenarioRun {
        let outcome = simulate_scenario(
            &scenario.name,
            scenario.parameters.model_parameters(),
            State::from(self.config.initial_state),
            self.config.t_max,
            self.config.samples,
            &self.config.solver,
        );
        ScenarioRun {
            name: scenario.name.clone(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configurations_are_rejected() {
        let cases = [
            SimulationConfig {
                initial_state: [0.03, 0.0, 0.005],
                ..Default::default()
            },
            SimulationConfig {
                initial_state: [0.03, f64::NAN, 0.005],
                ..Default::default()
            },
            SimulationConfig {
                t_max: 0.0,
                ..Default::default()
            },
            SimulationConfig {
                samples: 1,
                ..Default::default()
            },
            SimulationConfig {
                solver: SolverOptions {
                    rtol: 0.0,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];
        for config in cases {
            assert!(matches!(
                Runner::new(ScenarioTable::reference(), config),
                Err(SimulationError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn empty_selection_is_rejected() {
        let runner = Runner::default();
        let selected: [&str; 0] = [];
        assert_eq!(
            runner.run(&selected).unwrap_err(),
            SimulationError::EmptySelection
        );
    }

    #[test]
    fn repeated_names_are_simulated_once() {
        let runner = Runner::default();
        let name = "Scenario 2: Partially resistant + Medium therapy";
        let simulation = runner.run(&[name, name]).unwrap();
        assert_eq!(simulation.len(), 1);
        assert_eq!(simulation.names(), vec![name]);
    }

    #[test]
    fn results_keep_selection_order() {
        let runner = Runner::default();
        let selected = [
            "Scenario 7: Slow adaptive tumor + Reduced plasticity",
            "Scenario 1: Sensitive + High therapy",
            "Scenario 4: Adaptive mix + High plasticity",
        ];
        let simulation = runner.run(&selected).unwrap();
        assert_eq!(simulation.names(), selected.to_vec());
        assert_eq!(simulation.successes().count(), 3);
    }
}
