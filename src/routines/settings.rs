use std::time::Duration;

use config::Config as eConfig;
use eyre::{bail, Result, WrapErr};
use serde_derive::{Deserialize, Serialize};

use crate::routines::runner::SimulationConfig;
use crate::simulator::ode::SolverOptions;
use crate::simulator::NSTATES;
use crate::structs::scenario::{Scenario, ScenarioTable};

/// Volume above which intensive intervention is recommended
pub const CLINICAL_THRESHOLD: f64 = 0.2;

/// Contains all settings for a simulation run
///
/// Settings are read from a TOML file, see [read_settings]. Every section is optional and
/// falls back to the reference configuration.
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Settings {
    /// Scenario selection and execution
    pub config: Config,
    /// Initial state and time horizon
    pub simulation: Simulation,
    /// Tolerances and limits for the ODE solver
    pub solver: Solver,
    /// Configuration for logging
    pub log: Log,
    /// Configuration for the output files
    pub output: Output,
    /// Custom scenario table; the reference table is used when absent
    pub scenarios: Option<Vec<ScenarioDefinition>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            config: Config::default(),
            simulation: Simulation::default(),
            solver: Solver::default(),
            log: Log::default(),
            output: Output::default(),
            scenarios: None,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Settings::default()
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        self.log.validate()?;
        self.simulation_config()?.validate()?;
        self.scenario_table()?;
        if self.config.scenarios.is_empty() {
            bail!("At least one scenario must be selected in [config].scenarios");
        }
        Ok(())
    }

    /// The scenario table described by these settings
    pub fn scenario_table(&self) -> Result<ScenarioTable> {
        match &self.scenarios {
            Some(definitions) => {
                let scenarios = definitions.iter().cloned().map(Scenario::from).collect();
                ScenarioTable::new(scenarios).wrap_err("Invalid scenario table in settings")
            }
            None => Ok(ScenarioTable::reference()),
        }
    }

    pub fn simulation_config(&self) -> Result<SimulationConfig> {
        Ok(SimulationConfig {
            initial_state: self.simulation.initial_state,
            t_max: self.simulation.t_max,
            samples: self.simulation.samples,
            solver: SolverOptions {
                rtol: self.solver.rtol,
                atol: self.solver.atol,
                max_wall_time: self.solver.wall_time()?,
            },
            parallel: self.config.parallel,
        })
    }

    pub fn select(&mut self, scenarios: Vec<String>) {
        self.config.scenarios = scenarios;
    }

    pub fn set_log_level(&mut self, level: impl Into<String>) {
        self.log.level = level.into();
    }

    pub fn set_output(&mut self, write: bool, path: impl Into<String>) {
        self.output.write = write;
        self.output.path = path.into();
    }
}

/// General configuration settings
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Names of the scenarios to simulate, in display order
    pub scenarios: Vec<String>,
    /// If true (default), scenarios are integrated in parallel
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scenarios: vec![ScenarioTable::reference().names().remove(0)],
            parallel: true,
        }
    }
}

/// Initial state and sampling of the simulated horizon
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Simulation {
    /// Densities of the sensitive, partially resistant and resistant cells at t = 0
    pub initial_state: [f64; NSTATES],
    /// End of the simulated horizon, in days
    pub t_max: f64,
    /// Number of uniformly spaced samples on [0, t_max]
    pub samples: usize,
    /// Clinical threshold on the total volume, used in reports
    pub threshold: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        let reference = SimulationConfig::default();
        Simulation {
            initial_state: reference.initial_state,
            t_max: reference.t_max,
            samples: reference.samples,
            threshold: CLINICAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Solver {
    pub rtol: f64,
    pub atol: f64,
    /// Wall-clock budget per scenario, in seconds
    pub max_wall_time: Option<f64>,
}

impl Default for Solver {
    fn default() -> Self {
        let reference = SolverOptions::default();
        Solver {
            rtol: reference.rtol,
            atol: reference.atol,
            max_wall_time: reference.max_wall_time.map(|d| d.as_secs_f64()),
        }
    }
}

impl Solver {
    /// The wall-clock budget as a [Duration], rejecting negative or non-finite seconds
    pub fn wall_time(&self) -> Result<Option<Duration>> {
        match self.max_wall_time {
            None => Ok(None),
            Some(seconds) => match Duration::try_from_secs_f64(seconds) {
                Ok(limit) => Ok(Some(limit)),
                Err(err) => bail!(
                    "Invalid [solver].max_wall_time of {} seconds: {}",
                    seconds,
                    err
                ),
            },
        }
    }
}

/// Configuration for logging
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Log {
    /// The maximum log level to display
    ///
    /// One of `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    /// The file to write the log to, relative to the output folder
    pub file: String,
    /// Whether to write a log file
    pub write: bool,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: String::from("info"),
            file: String::from("log.txt"),
            write: false,
        }
    }
}

impl Log {
    pub fn validate(&self) -> Result<()> {
        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => bail!("Invalid log level '{}'", other),
        }
    }
}

/// Configuration for the output files
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Output {
    /// Whether to write the output files
    pub write: bool,
    /// The (relative) path to write the files to
    pub path: String,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            write: false,
            path: String::from("outputs/"),
        }
    }
}

/// A scenario as written in the settings file
#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    pub name: String,
    pub mu: [f64; NSTATES],
    pub epsilon: f64,
    pub transition: f64,
}

impl From<ScenarioDefinition> for Scenario {
    fn from(definition: ScenarioDefinition) -> Self {
        Scenario::new(
            definition.name,
            definition.mu,
            definition.epsilon,
            definition.transition,
        )
    }
}

/// Read and validate settings from a TOML file
///
/// Values can be overridden with environment variables prefixed by `TUMORSIM`, e.g.
/// `TUMORSIM_SOLVER__RTOL=1e-8`.
pub fn read_settings(path: impl Into<String>) -> Result<Settings> {
    let settings_path = path.into();

    let parsed = eConfig::builder()
        .add_source(config::File::with_name(&settings_path).format(config::FileFormat::Toml))
        .add_source(
            config::Environment::with_prefix("TUMORSIM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .wrap_err_with(|| format!("Unable to read settings from {}", settings_path))?;

    let settings: Settings = parsed
        .try_deserialize()
        .wrap_err_with(|| format!("Unable to parse settings in {}", settings_path))?;

    settings.validate()?;
    Ok(settings)
}
