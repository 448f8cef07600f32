pub mod ode;

use ode_solvers::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::structs::scenario::ScenarioParameters;

pub type T = f64;
/// Cell densities of the (sensitive, partially resistant, resistant) subpopulations
pub type State = Vector3<T>;

/// Number of tracked subpopulations
pub const NSTATES: usize = 3;

/// Names of the subpopulations, in state-vector order
pub const SUBPOPULATIONS: [&str; NSTATES] = ["sensitive", "partial", "resistant"];

/// Intrinsic growth rates. Resistance carries a fitness cost, so sensitive cells grow fastest.
pub const GROWTH_RATES: [T; NSTATES] = [0.03, 0.02, 0.015];

/// Shared carrying capacity of the logistic term
pub const CARRYING_CAPACITY: T = 1.0;

/// State-transition rates between subpopulations, before scaling by the plasticity factor.
///
/// Entry `[i][j]` is the rate at which cells of state `j` feed state `i`.
pub const BASE_TRANSITION: [[T; NSTATES]; NSTATES] = [
    [0.0, 0.001, 0.0005],
    [0.001, 0.0, 0.001],
    [0.0002, 0.001, 0.0],
];

/// A 3×3 matrix of non-negative transition rates with a zero diagonal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix([[T; NSTATES]; NSTATES]);

impl TransitionMatrix {
    /// Builds a matrix from raw rates, rejecting negative, non-finite or diagonal entries
    pub fn new(rates: [[T; NSTATES]; NSTATES]) -> Result<Self, String> {
        for (i, row) in rates.iter().enumerate() {
            for (j, &rate) in row.iter().enumerate() {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(format!(
                        "transition rate [{}][{}] must be finite and non-negative, got {}",
                        i, j, rate
                    ));
                }
                if i == j && rate != 0.0 {
                    return Err(format!(
                        "transition rate [{}][{}] lies on the diagonal and must be zero, got {}",
                        i, j, rate
                    ));
                }
            }
        }
        Ok(TransitionMatrix(rates))
    }

    /// The fixed base matrix
    pub fn base() -> Self {
        TransitionMatrix(BASE_TRANSITION)
    }

    /// The base matrix multiplied by a plasticity factor
    pub fn scaled(factor: T) -> Self {
        let mut rates = BASE_TRANSITION;
        rates
            .iter_mut()
            .flat_map(|row| row.iter_mut())
            .for_each(|rate| *rate *= factor);
        TransitionMatrix(rates)
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.0[i][j]
    }

    /// Total rate at which state `i` loses cells to the other states
    pub fn outflow_rate(&self, i: usize) -> T {
        (0..NSTATES).filter(|&j| j != i).map(|j| self.0[i][j]).sum()
    }

    pub fn rates(&self) -> &[[T; NSTATES]; NSTATES] {
        &self.0
    }
}

/// Parameter bundle passed explicitly to every evaluation of [derivative]
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub epsilon: T,
    pub mu: State,
    pub transition: TransitionMatrix,
}

impl ModelParameters {
    pub fn new(epsilon: T, mu: [T; NSTATES], transition: TransitionMatrix) -> Self {
        ModelParameters {
            epsilon,
            mu: State::from(mu),
            transition,
        }
    }
}

impl From<&ScenarioParameters> for ModelParameters {
    fn from(params: &ScenarioParameters) -> Self {
        ModelParameters::new(
            params.epsilon,
            params.mu,
            TransitionMatrix::scaled(params.transition),
        )
    }
}

/// Net gain of each state through plasticity: inflow from the other states minus outflow to them
pub fn transition_flux(x: &State, matrix: &TransitionMatrix) -> State {
    State::from_fn(|i, _| {
        let inflow: T = (0..NSTATES)
            .filter(|&j| j != i)
            .map(|j| matrix.get(i, j) * x[j])
            .sum();
        inflow - x[i] * matrix.outflow_rate(i)
    })
}

/// Right-hand side of the tumor model
///
/// Each subpopulation grows logistically against the shared carrying capacity, dies under
/// therapy at rate `epsilon * mu_i` and exchanges cells with the other states through the
/// transition matrix. The system is autonomous, `t` is accepted for solver compatibility.
///
/// Nothing here keeps states non-negative or below the carrying capacity; a total above
/// [CARRYING_CAPACITY] simply turns the growth term negative.
pub fn derivative(_t: T, x: &State, params: &ModelParameters) -> State {
    let total = x.sum();
    let crowding = 1.0 - total / CARRYING_CAPACITY;
    let flux = transition_flux(x, &params.transition);
    State::from_fn(|i, _| {
        let growth = GROWTH_RATES[i] * x[i] * crowding;
        let therapy = -params.epsilon * params.mu[i] * x[i];
        growth + therapy + flux[i]
    })
}
