use eyre::Result;
use std::path::PathBuf;
use tumorsim::prelude::*;

fn scratch_folder(name: &str) -> PathBuf {
    let folder = std::env::temp_dir().join(format!("tumorsim-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&folder);
    folder
}

/// Test Settings serialization to JSON
#[test]
fn test_settings_serialization() -> Result<()> {
    let mut settings = Settings::new();
    settings.select(vec!["Scenario 4: Adaptive mix + High plasticity".to_string()]);

    let json = serde_json::to_string(&settings)?;
    assert!(json.contains("\"simulation\""));
    assert!(json.contains("\"solver\""));
    assert!(json.contains("Scenario 4: Adaptive mix + High plasticity"));

    let deserialized: Settings = serde_json::from_str(&json)?;
    assert_eq!(deserialized.config.scenarios, settings.config.scenarios);
    Ok(())
}

/// Test that unknown keys are rejected instead of ignored
#[test]
fn test_settings_unknown_fields() {
    let json = r#"{"solver": {"rtol": 1e-6, "atol": 1e-9, "max_wall_time": null, "method": "rk4"}}"#;
    assert!(serde_json::from_str::<Settings>(json).is_err());
}

/// Test the wall-clock budget conversion
#[test]
fn test_settings_without_time_limit() -> Result<()> {
    let mut settings = Settings::new();
    settings.solver.max_wall_time = None;
    assert_eq!(settings.simulation_config()?.solver.max_wall_time, None);
    Ok(())
}

/// Test that an unusable wall-clock budget is an error rather than a panic
#[test]
fn test_settings_invalid_time_limit() {
    for seconds in [-1.0, f64::NAN, f64::INFINITY, 1e30] {
        let mut settings = Settings::new();
        settings.solver.max_wall_time = Some(seconds);
        assert!(settings.simulation_config().is_err(), "{seconds} was accepted");
        assert!(settings.validate().is_err());
    }
}

/// Test writing the report files
#[test]
fn test_write_outputs() -> Result<()> {
    let folder = scratch_folder("outputs");
    let mut settings = Settings::new();
    settings.set_output(true, folder.to_string_lossy());
    settings.select(vec![
        "Scenario 1: Sensitive + High therapy".to_string(),
        "Scenario 5: Experimental control".to_string(),
    ]);

    let simulation = Runner::new(settings.scenario_table()?, settings.simulation_config()?)?
        .run(&settings.config.scenarios)?;
    output::write_outputs(&simulation, &settings)?;

    let trajectories = std::fs::read_to_string(folder.join("trajectories.csv"))?;
    let mut lines = trajectories.lines();
    assert_eq!(
        lines.next(),
        Some("scenario,time,sensitive,partial,resistant,total")
    );
    // Two scenarios with 300 samples each
    assert_eq!(lines.count(), 600);

    let proportions = std::fs::read_to_string(folder.join("proportions.csv"))?;
    assert_eq!(proportions.lines().count(), 601);

    let summary = std::fs::read_to_string(folder.join("summary.csv"))?;
    let rows: Vec<&str> = summary.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("Scenario 1: Sensitive + High therapy,ok,"));
    assert!(rows[2].starts_with("Scenario 5: Experimental control,ok,"));

    let written: Settings =
        serde_json::from_str(&std::fs::read_to_string(folder.join("settings.json"))?)?;
    assert_eq!(written, settings);

    std::fs::remove_dir_all(&folder)?;
    Ok(())
}

/// Failed scenarios are listed in the summary with their error
#[test]
fn test_summary_lists_failures() -> Result<()> {
    let folder = scratch_folder("failures");
    let table = ScenarioTable::new(vec![Scenario::new(
        "Runaway plasticity",
        [0.9, 0.5, 0.1],
        0.8,
        1e9,
    )])?;
    let config = SimulationConfig {
        solver: SolverOptions {
            max_wall_time: None,
            ..SolverOptions::default()
        },
        ..SimulationConfig::default()
    };
    let simulation = Runner::new(table, config)?.run(&["Runaway plasticity"])?;
    output::write_summary(&simulation, &folder.to_string_lossy(), CLINICAL_THRESHOLD)?;

    let summary = std::fs::read_to_string(folder.join("summary.csv"))?;
    let row = summary.lines().nth(1).unwrap();
    assert!(row.starts_with("Runaway plasticity,failed,"));
    assert!(row.contains("Integration of scenario"));

    std::fs::remove_dir_all(&folder)?;
    Ok(())
}
