#[cfg(test)]
use crate::prelude::*;

#[test]
fn read_selection() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    assert_eq!(
        settings.config.scenarios,
        vec![
            "Scenario 3: High resistance + Low therapy",
            "Scenario 5: Experimental control"
        ]
    );
    assert!(!settings.config.parallel);
}

#[test]
fn read_simulation_section() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    assert_eq!(settings.simulation.initial_state, [0.03, 0.015, 0.005]);
    assert_eq!(settings.simulation.t_max, 150.0);
    assert_eq!(settings.simulation.samples, 151);
    assert_eq!(settings.simulation.threshold, 0.25);
}

#[test]
fn read_solver_section() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    let config = settings.simulation_config().unwrap();
    assert_eq!(config.solver.rtol, 1e-7);
    assert_eq!(config.solver.atol, 1e-10);
    assert_eq!(
        config.solver.max_wall_time,
        Some(std::time::Duration::from_secs(5))
    );
}

#[test]
fn read_log_section() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    assert_eq!(settings.log.level, "debug");
    assert_eq!(settings.log.file, "run.log");
    assert!(!settings.log.write);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let settings = read_settings("src/tests/custom.toml").unwrap();
    assert_eq!(settings.simulation, settings::Simulation::default());
    assert_eq!(settings.solver, settings::Solver::default());
    assert_eq!(settings.output, settings::Output::default());
}

#[test]
fn read_custom_scenarios() {
    let settings = read_settings("src/tests/custom.toml").unwrap();
    let table = settings.scenario_table().unwrap();
    assert_eq!(table.names(), vec!["Watchful waiting", "Maximal dose"]);
    let maximal = table.get("Maximal dose").unwrap();
    assert_eq!(maximal.parameters.mu, [1.0, 1.0, 1.0]);
    assert_eq!(maximal.parameters.transition, 0.5);
}

#[test]
fn reject_invalid_custom_scenarios() {
    assert!(read_settings("src/tests/invalid.toml").is_err());
}

#[test]
fn reject_negative_wall_time() {
    let err = read_settings("src/tests/negative_budget.toml").unwrap_err();
    assert!(format!("{err:?}").contains("max_wall_time"));
}

#[test]
fn reject_missing_settings_file() {
    assert!(read_settings("src/tests/does_not_exist.toml").is_err());
}

#[test]
fn simulate_configured_run() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    let simulation = simulate(settings).unwrap();
    assert_eq!(simulation.len(), 2);

    let control = simulation
        .trajectory("Scenario 5: Experimental control")
        .unwrap();
    assert_eq!(control.len(), 151);
    assert_eq!(control.times()[150], 150.0);
    assert!(control.threshold_crossing(0.25).is_some());

    let treated = simulation
        .trajectory("Scenario 3: High resistance + Low therapy")
        .unwrap();
    assert!(treated.threshold_crossing(0.25).is_none());
}

#[test]
fn simulate_custom_table() {
    let settings = read_settings("src/tests/custom.toml").unwrap();
    let simulation = simulate(settings).unwrap();
    let untreated = simulation.trajectory("Watchful waiting").unwrap();
    let treated = simulation.trajectory("Maximal dose").unwrap();
    let last = untreated.len() - 1;
    assert!(untreated.total_volume()[last] > treated.total_volume()[last]);
}
