use std::time::{Duration, Instant};

use ndarray::{Array1, Array2};
use ode_solvers::{Dopri5, System};

use crate::error::SimulationError;
use crate::simulator::{derivative, ModelParameters, State, NSTATES, T};
use crate::structs::trajectory::Trajectory;

/// Tolerances and limits for a single integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    pub rtol: f64,
    pub atol: f64,
    /// Wall-clock budget for one scenario
    pub max_wall_time: Option<Duration>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            rtol: 1e-6,
            atol: 1e-9,
            max_wall_time: Some(Duration::from_secs(30)),
        }
    }
}

/// Uniform evaluation grid `t_k = t_max * k / (samples - 1)`, exact at both ends
pub fn time_grid(t_max: T, samples: usize) -> Array1<T> {
    let intervals = (samples.max(2) - 1) as f64;
    Array1::from_shape_fn(samples, |k| t_max * k as f64 / intervals)
}

struct Dynamics {
    params: ModelParameters,
    deadline: Option<Instant>,
}

impl System<T, State> for Dynamics {
    fn system(&self, t: T, y: &State, dy: &mut State) {
        *dy = derivative(t, y, &self.params);
    }

    fn solout(&mut self, _t: T, _y: &State, _dy: &State) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// Integrate one scenario over `[0, t_max]` and sample it at `samples` uniform points
///
/// A single Dopri5 run is used with its dense output spaced one grid interval apart. The end
/// of integration is pushed a fraction of an interval past `t_max` so that rounding in the
/// accumulated output times never drops the last sample.
pub fn simulate_scenario(
    scenario: &str,
    params: ModelParameters,
    x0: State,
    t_max: T,
    samples: usize,
    options: &SolverOptions,
) -> Result<Trajectory, SimulationError> {
    if samples < 2 || !(t_max > 0.0) {
        return Err(SimulationError::InvalidConfiguration(format!(
            "need at least 2 samples over a positive horizon, got {} samples over {}",
            samples, t_max
        )));
    }
    let times = time_grid(t_max, samples);
    let dx = t_max / (samples - 1) as f64;
    let t_end = t_max + dx * 1e-6;

    let start = Instant::now();
    let system = Dynamics {
        params,
        deadline: options.max_wall_time.map(|limit| start + limit),
    };

    let mut stepper = Dopri5::new(system, 0.0, t_end, dx, x0, options.rtol, options.atol);
    let stats = stepper
        .integrate()
        .map_err(|err| SimulationError::Integration {
            scenario: scenario.to_string(),
            reason: err.to_string(),
        })?;

    let reached = stepper.x_out().last().copied().unwrap_or(0.0);
    let y_out = stepper.y_out();
    if y_out.len() < samples {
        return Err(match options.max_wall_time {
            Some(limit) if start.elapsed() >= limit => SimulationError::Timeout {
                scenario: scenario.to_string(),
                limit,
                time: reached,
            },
            _ => SimulationError::Integration {
                scenario: scenario.to_string(),
                reason: format!(
                    "solver produced {} of {} samples, last at t = {}",
                    y_out.len(),
                    samples,
                    reached
                ),
            },
        });
    }

    let states = sampled_states(scenario, &times, &y_out[..samples])?;

    tracing::debug!(
        "Integrated '{}' in {:.2?} with {} accepted and {} rejected steps",
        scenario,
        start.elapsed(),
        stats.accepted_steps,
        stats.rejected_steps
    );

    Ok(Trajectory::new(times, states))
}

/// Copy the dense output into a `samples x NSTATES` array
///
/// Dopri5 rejects steps whose error norm is not finite, so a diverging state normally ends
/// as an `Integration` failure. This catches non-finite values that reach the interpolated
/// output anyway.
fn sampled_states(
    scenario: &str,
    times: &Array1<T>,
    y_out: &[State],
) -> Result<Array2<T>, SimulationError> {
    let mut states = Array2::<T>::zeros((y_out.len(), NSTATES));
    for (k, (mut row, y)) in states.rows_mut().into_iter().zip(y_out.iter()).enumerate() {
        if y.iter().any(|v| !v.is_finite()) {
            return Err(SimulationError::NonFinite {
                scenario: scenario.to_string(),
                time: times[k],
            });
        }
        row.iter_mut().zip(y.iter()).for_each(|(r, &v)| *r = v);
    }
    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::TransitionMatrix;
    use approx::assert_relative_eq;

    fn x0() -> State {
        State::new(0.03, 0.015, 0.005)
    }

    #[test]
    fn grid_spans_horizon_exactly() {
        let grid = time_grid(300.0, 300);
        assert_eq!(grid.len(), 300);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[299], 300.0);
        assert!(grid.windows(2).into_iter().all(|w| w[1] > w[0]));
    }

    #[test]
    fn untreated_single_population_follows_logistic_solution() {
        // Only the sensitive population is seeded and plasticity is off,
        // so x(t) = x0 e^{rt} / (1 - x0 + x0 e^{rt})
        let params = ModelParameters::new(0.0, [0.0; 3], TransitionMatrix::scaled(0.0));
        let start = State::new(0.05, 0.0, 0.0);
        let trajectory = simulate_scenario(
            "logistic",
            params,
            start,
            200.0,
            201,
            &SolverOptions::default(),
        )
        .unwrap();

        for (t, row) in trajectory.times().iter().zip(trajectory.states().rows()) {
            let growth = (0.03 * t).exp();
            let analytic = 0.05 * growth / (1.0 - 0.05 + 0.05 * growth);
            assert_relative_eq!(row[0], analytic, max_relative = 1e-4);
            assert_eq!(row[1], 0.0);
            assert_eq!(row[2], 0.0);
        }
    }

    #[test]
    fn first_sample_is_the_initial_state() {
        let params = ModelParameters::new(0.8, [0.9, 0.5, 0.1], TransitionMatrix::scaled(1.0));
        let trajectory =
            simulate_scenario("first", params, x0(), 300.0, 300, &SolverOptions::default())
                .unwrap();
        let first = trajectory.states().row(0);
        assert_relative_eq!(first[0], 0.03, epsilon = 1e-15);
        assert_relative_eq!(first[1], 0.015, epsilon = 1e-15);
        assert_relative_eq!(first[2], 0.005, epsilon = 1e-15);
        assert_eq!(trajectory.len(), 300);
    }

    #[test]
    fn exhausted_budget_reports_timeout() {
        let params = ModelParameters::new(0.8, [0.9, 0.5, 0.1], TransitionMatrix::scaled(1.0));
        let options = SolverOptions {
            max_wall_time: Some(Duration::ZERO),
            ..SolverOptions::default()
        };
        let err = simulate_scenario("slow", params, x0(), 300.0, 300, &options).unwrap_err();
        assert!(matches!(err, SimulationError::Timeout { .. }));
        assert!(err.is_scenario_failure());
    }

    #[test]
    fn extreme_plasticity_fails_without_panicking() {
        let params = ModelParameters::new(0.8, [0.9, 0.5, 0.1], TransitionMatrix::scaled(1e9));
        let err = simulate_scenario(
            "stiff",
            params,
            x0(),
            300.0,
            300,
            &SolverOptions {
                max_wall_time: None,
                ..SolverOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Integration { .. }));
    }

    #[test]
    fn non_finite_output_is_reported_with_its_time() {
        let times = time_grid(2.0, 3);
        let y_out = vec![x0(), State::new(0.1, f64::NAN, 0.0), x0()];
        let err = sampled_states("diverging", &times, &y_out).unwrap_err();
        assert_eq!(
            err,
            SimulationError::NonFinite {
                scenario: "diverging".to_string(),
                time: 1.0,
            }
        );
        assert!(err.is_scenario_failure());
    }

    #[test]
    fn finite_output_is_copied_row_by_row() {
        let times = time_grid(1.0, 2);
        let y_out = vec![x0(), State::new(0.1, 0.2, 0.3)];
        let states = sampled_states("copy", &times, &y_out).unwrap();
        assert_eq!(states.nrows(), 2);
        assert_eq!(states[[1, 2]], 0.3);
        assert_eq!(states[[0, 0]], 0.03);
    }
}
