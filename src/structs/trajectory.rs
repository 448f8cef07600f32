use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::simulator::{State, NSTATES, SUBPOPULATIONS};

/// Sampled solution of the model for one scenario
///
/// `states` has one row per entry of `times` and one column per subpopulation, in the order
/// given by [SUBPOPULATIONS].
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Array1<f64>,
    states: Array2<f64>,
}

impl Trajectory {
    /// Shapes are guaranteed by the integrator, a mismatch is a bug in the caller
    pub(crate) fn new(times: Array1<f64>, states: Array2<f64>) -> Self {
        assert_eq!(
            times.len(),
            states.nrows(),
            "a trajectory needs one state per time point"
        );
        assert_eq!(states.ncols(), NSTATES);
        Trajectory { times, states }
    }

    pub fn times(&self) -> &Array1<f64> {
        &self.times
    }

    pub fn states(&self) -> &Array2<f64> {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// State vector at sample `index`
    pub fn state(&self, index: usize) -> Option<State> {
        if index >= self.len() {
            return None;
        }
        let row = self.states.row(index);
        Some(State::new(row[0], row[1], row[2]))
    }

    /// Time series of one subpopulation
    pub fn subpopulation(&self, index: usize) -> ArrayView1<'_, f64> {
        self.states.column(index)
    }

    /// Total tumor volume at each time point
    pub fn total_volume(&self) -> Array1<f64> {
        self.states.sum_axis(Axis(1))
    }

    /// Share of each subpopulation in the total volume at each time point
    ///
    /// Where the total is not strictly positive (or not finite) the proportions are defined as
    /// zero for every subpopulation instead of propagating a division by zero.
    pub fn proportions(&self) -> Array2<f64> {
        let mut proportions = self.states.clone();
        for mut row in proportions.rows_mut() {
            let total = row.sum();
            if total > 0.0 && total.is_finite() {
                row.mapv_inplace(|x| x / total);
            } else {
                row.fill(0.0);
            }
        }
        proportions
    }

    /// First sampled time at which the total volume reaches `threshold`
    pub fn threshold_crossing(&self, threshold: f64) -> Option<f64> {
        self.total_volume()
            .iter()
            .position(|&v| v >= threshold)
            .map(|k| self.times[k])
    }

    /// Largest total volume and the time at which it is reached
    pub fn peak_volume(&self) -> Option<(f64, f64)> {
        self.total_volume()
            .iter()
            .zip(self.times.iter())
            .fold(None, |peak, (&v, &t)| match peak {
                Some((max, _)) if max >= v => peak,
                _ => Some((v, t)),
            })
    }

    pub fn final_state(&self) -> Option<State> {
        self.len().checked_sub(1).and_then(|last| self.state(last))
    }

    /// Condensed description used by reports
    pub fn summarize(&self, threshold: f64) -> Summary {
        let totals = self.total_volume();
        let initial_volume = totals.first().copied().unwrap_or(0.0);
        let final_volume = totals.last().copied().unwrap_or(0.0);
        let (peak_volume, peak_time) = self.peak_volume().unwrap_or((0.0, 0.0));
        let final_proportions = self
            .proportions()
            .rows()
            .into_iter()
            .last()
            .map(|row| [row[0], row[1], row[2]])
            .unwrap_or([0.0; NSTATES]);
        let dominant = final_proportions
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p > 0.0)
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, top)) if top >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, _)| SUBPOPULATIONS[i]);

        Summary {
            initial_volume,
            final_volume,
            peak_volume,
            peak_time,
            threshold_crossing: self.threshold_crossing(threshold),
            final_proportions,
            dominant,
        }
    }
}

/// Scalar indicators derived from a [Trajectory]
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_volume: f64,
    pub final_volume: f64,
    pub peak_volume: f64,
    pub peak_time: f64,
    /// First sampled time with a total volume at or above the clinical threshold
    pub threshold_crossing: Option<f64>,
    pub final_proportions: [f64; NSTATES],
    /// Subpopulation with the largest share at the end of the horizon, if any cells remain
    pub dominant: Option<&'static str>,
}
