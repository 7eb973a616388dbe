// kalman_core/src/estimation/mod.rs

use crate::types::{Observation, State};

/// The contract for any algorithm that performs the "State Estimator" role.
/// Its sole responsibility is to estimate the state of a linear system from
/// a stream of measurements taken at the nominal sample period.
pub trait StateEstimator: Send + Sync {
    /// Projects the estimate one nominal timestep into the future.
    fn predict(&mut self);

    /// Fuses the measurement `y` into the current estimate.
    fn correct(&mut self, y: &Observation);

    /// Returns a reference to the current best estimate of the state.
    fn get_state(&self) -> &State;

    /// Returns the estimate to its initial value.
    fn reset(&mut self);
}

pub mod discretization;
pub mod filters;
pub mod riccati;
pub mod stabilizability;
