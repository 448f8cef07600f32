use crate::logger;
use crate::routines::output;
use crate::routines::runner::{Runner, Simulation};
use crate::routines::settings::{read_settings, Settings};

use eyre::{Result, WrapErr};
use std::time::Instant;

/// Simulate the selected reference scenarios
///
/// This is the entrypoint for presentation layers: it uses the reference scenario table and
/// the reference configuration (initial state `(0.03, 0.015, 0.005)`, 300 samples on
/// `[0, 300]`). It does not configure logging and does not write any files.
///
/// Unknown names fail the whole call before anything is integrated; integration failures are
/// reported per scenario inside the returned [Simulation].
pub fn run<S: AsRef<str>>(selected: &[S]) -> Result<Simulation> {
    let simulation = Runner::default().run(selected)?;
    Ok(simulation)
}

/// Primary entrypoint for configured runs
///
/// Sets up logging, builds the scenario table and simulation configuration from `settings`,
/// runs the selected scenarios, logs a summary per scenario and, if `output.write` is set,
/// writes the CSV reports and the settings to the output folder.
pub fn simulate(settings: Settings) -> Result<Simulation> {
    let now = Instant::now();
    settings.validate()?;
    logger::setup_log(&settings)?;
    tracing::info!("Starting tumorsim");

    let table = settings.scenario_table()?;
    let runner = Runner::new(table, settings.simulation_config()?)?;
    tracing::info!(
        "Scenario table holds {} scenarios, {} selected",
        runner.table().len(),
        settings.config.scenarios.len()
    );

    let simulation = match runner.run(&settings.config.scenarios) {
        Ok(simulation) => simulation,
        Err(err) => {
            tracing::error!("Unable to start the simulation: {}", err);
            return Err(err.into());
        }
    };

    output::log_summary(&simulation, settings.simulation.threshold);

    // Tell the user where the output files will be written
    match settings.output.write {
        true => {
            output::write_outputs(&simulation, &settings)
                .wrap_err("Failed to write output files")?;
            tracing::info!("Output files written to {}", settings.output.path);
        }
        false => {
            tracing::info!("Output files will not be written - set `write = true` in the [output] section to enable them")
        }
    }

    tracing::info!("Program complete after {:.2?}", now.elapsed());
    Ok(simulation)
}

/// Read settings from a TOML file and [simulate] them
pub fn simulate_file(settings_path: &str) -> Result<Simulation> {
    let settings = read_settings(settings_path)?;
    simulate(settings)
}
