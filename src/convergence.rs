use crate::comm::{CommError, Communicator};

/// Iterations between group-wide error reductions.
pub const REDUCED: u64 = 5;

/// Tracks the group-wide error figure and the termination predicate.
///
/// `global_error` is refreshed only at the reduction cadence; between
/// reductions it holds the last reduced value, stale by up to
/// `REDUCED - 1` iterations. The staleness is intentional, it amortizes
/// the cost of the collective. It starts at 1.0, so for any threshold
/// below 1.0 the predicate cannot fire before the first reduction.
pub struct ConvergenceMonitor {
    precision: f64,
    global_error: f64,
}

impl ConvergenceMonitor {
    pub fn new(precision: f64) -> Self {
        ConvergenceMonitor {
            precision,
            global_error: 1.0,
        }
    }

    /// Folds `local_error` into the group max when `iteration` sits on
    /// the reduction cadence. Returns the current global figure either
    /// way.
    pub fn maybe_reduce<C: Communicator>(
        &mut self,
        comm: &mut C,
        local_error: f64,
        iteration: u64,
    ) -> Result<f64, CommError> {
        if iteration % REDUCED == 0 {
            self.global_error = comm.allreduce_max(local_error)?;
        }
        Ok(self.global_error)
    }

    /// Checked every iteration, against a possibly stale value.
    pub fn converged(&self) -> bool {
        self.global_error < self.precision
    }

    pub fn global_error(&self) -> f64 {
        self.global_error
    }
}
