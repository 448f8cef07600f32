use crate::routines::runner::Simulation;
use crate::routines::settings::Settings;
use crate::simulator::SUBPOPULATIONS;
use csv::WriterBuilder;
use eyre::{Result, WrapErr};
use std::fs::{create_dir_all, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Write every report file for a finished simulation
///
/// The core keeps results in memory only; this is the export side of the presentation layer.
pub fn write_outputs(simulation: &Simulation, settings: &Settings) -> Result<()> {
    tracing::debug!("Writing outputs to {:?}", settings.output.path);
    let folder = settings.output.path.as_str();
    write_trajectories(simulation, folder)?;
    write_proportions(simulation, folder)?;
    write_summary(simulation, folder, settings.simulation.threshold)?;
    write_settings(settings, folder)?;
    Ok(())
}

/// Writes the sampled states and total volume of every successful scenario
pub fn write_trajectories(simulation: &Simulation, folder: &str) -> Result<()> {
    let outputfile = OutputFile::new(folder, "trajectories.csv")
        .wrap_err("Failed to create output file for trajectories")?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(outputfile.file());

    let mut header = vec!["scenario", "time"];
    header.extend(SUBPOPULATIONS);
    header.push("total");
    writer.write_record(&header)?;

    for (name, trajectory) in simulation.successes() {
        let totals = trajectory.total_volume();
        for ((time, state), total) in trajectory
            .times()
            .iter()
            .zip(trajectory.states().rows())
            .zip(totals.iter())
        {
            let mut row = vec![name.to_string(), time.to_string()];
            row.extend(state.iter().map(|x| x.to_string()));
            row.push(total.to_string());
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    tracing::debug!("Trajectories written to {:?}", outputfile.relative_path());
    Ok(())
}

/// Writes the relative share of each subpopulation over time
pub fn write_proportions(simulation: &Simulation, folder: &str) -> Result<()> {
    let outputfile = OutputFile::new(folder, "proportions.csv")
        .wrap_err("Failed to create output file for proportions")?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(outputfile.file());

    let mut header = vec!["scenario", "time"];
    header.extend(SUBPOPULATIONS);
    writer.write_record(&header)?;

    for (name, trajectory) in simulation.successes() {
        let proportions = trajectory.proportions();
        for (time, shares) in trajectory.times().iter().zip(proportions.rows()) {
            let mut row = vec![name.to_string(), time.to_string()];
            row.extend(shares.iter().map(|p| p.to_string()));
            writer.write_record(&row)?;
        }
    }
    writer.flush()?;
    tracing::debug!("Proportions written to {:?}", outputfile.relative_path());
    Ok(())
}

/// Writes one line per scenario, including the failed ones
pub fn write_summary(simulation: &Simulation, folder: &str, threshold: f64) -> Result<()> {
    let outputfile = OutputFile::new(folder, "summary.csv")
        .wrap_err("Failed to create output file for the summary")?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_writer(outputfile.file());

    writer.write_record([
        "scenario",
        "status",
        "initial_volume",
        "final_volume",
        "peak_volume",
        "peak_time",
        "threshold_crossing",
        "final_sensitive",
        "final_partial",
        "final_resistant",
        "dominant",
        "error",
    ])?;

    for run in simulation.iter() {
        match &run.outcome {
            Ok(trajectory) => {
                let summary = trajectory.summarize(threshold);
                let mut row = vec![
                    run.name.clone(),
                    "ok".to_string(),
                    summary.initial_volume.to_string(),
                    summary.final_volume.to_string(),
                    summary.peak_volume.to_string(),
                    summary.peak_time.to_string(),
                    summary
                        .threshold_crossing
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                ];
                row.extend(summary.final_proportions.iter().map(|p| p.to_string()));
                row.push(summary.dominant.unwrap_or_default().to_string());
                row.push(String::new());
                writer.write_record(&row)?;
            }
            Err(err) => {
                let mut row = vec![run.name.clone(), "failed".to_string()];
                row.extend(std::iter::repeat(String::new()).take(9));
                row.push(err.to_string());
                writer.write_record(&row)?;
            }
        }
    }
    writer.flush()?;
    tracing::debug!("Summary written to {:?}", outputfile.relative_path());
    Ok(())
}

/// Writes the settings used for the run as JSON
pub fn write_settings(settings: &Settings, folder: &str) -> Result<()> {
    let serialized = serde_json::to_string_pretty(settings)?;
    let outputfile = OutputFile::new(folder, "settings.json")?;
    std::io::Write::write_all(&mut outputfile.file(), serialized.as_bytes())?;
    Ok(())
}

/// Log a short report per scenario
pub fn log_summary(simulation: &Simulation, threshold: f64) {
    for run in simulation.iter() {
        match &run.outcome {
            Ok(trajectory) => {
                let summary = trajectory.summarize(threshold);
                let crossing = match summary.threshold_crossing {
                    Some(t) => format!("crosses {} at t = {:.1}", threshold, t),
                    None => format!("stays below {}", threshold),
                };
                let composition = match summary.dominant {
                    Some(name) => format!("dominated by {} cells", name),
                    None => "no cells left".to_string(),
                };
                tracing::info!(
                    "{}: volume {:.4} -> {:.4} (peak {:.4} at t = {:.1}), {}, {}",
                    run.name,
                    summary.initial_volume,
                    summary.final_volume,
                    summary.peak_volume,
                    summary.peak_time,
                    crossing,
                    composition
                );
            }
            Err(err) => tracing::warn!("{}: no trajectory ({})", run.name, err),
        }
    }
}

#[derive(Debug)]
pub struct OutputFile {
    file: File,
    relative_path: PathBuf,
}

impl OutputFile {
    pub fn new(folder: &str, file_name: &str) -> Result<Self> {
        let relative_path = Path::new(&folder).join(file_name);

        if let Some(parent) = relative_path.parent() {
            create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create directories for {:?}", parent))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&relative_path)
            .wrap_err_with(|| format!("Failed to open file: {:?}", relative_path))?;

        Ok(OutputFile {
            file,
            relative_path,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_owned(self) -> File {
        self.file
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }
}
