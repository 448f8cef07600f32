//! Simulation of a compartmental ODE model of tumor growth under therapy.
//!
//! Three subpopulations (sensitive, partially resistant, resistant) grow logistically against a
//! shared carrying capacity, die under therapy according to their sensitivity, and switch
//! between states through a plasticity-scaled transition matrix. A set of named scenarios is
//! integrated with an adaptive Dormand–Prince solver and returned as sampled trajectories.

pub mod entrypoints;
pub mod error;
pub mod logger;
pub mod routines {
    pub mod output;
    pub mod runner;
    pub mod settings;
}
pub mod simulator;
pub mod structs {
    pub mod scenario;
    pub mod trajectory;
}

pub mod prelude {
    pub use crate::entrypoints::{run, simulate, simulate_file};
    pub use crate::error::SimulationError;
    pub use crate::routines::output;
    pub use crate::routines::runner::{Runner, ScenarioRun, Simulation, SimulationConfig};
    pub use crate::routines::settings::{
        self, read_settings, ScenarioDefinition, Settings, CLINICAL_THRESHOLD,
    };
    pub use crate::simulator::ode::{simulate_scenario, time_grid, SolverOptions};
    pub use crate::simulator::{
        derivative, transition_flux, ModelParameters, State, TransitionMatrix, CARRYING_CAPACITY,
        GROWTH_RATES, SUBPOPULATIONS,
    };
    pub use crate::structs::scenario::{Scenario, ScenarioParameters, ScenarioTable};
    pub use crate::structs::trajectory::{Summary, Trajectory};
}

//Tests
mod tests;
