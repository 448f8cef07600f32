use eyre::Result;
use tumorsim::prelude::*;

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => read_settings(path)?,
        None => Settings::new(),
    };
    let simulation = simulate(settings)?;

    if simulation.successes().count() == 0 {
        eyre::bail!("None of the selected scenarios could be simulated");
    }
    Ok(())
}
