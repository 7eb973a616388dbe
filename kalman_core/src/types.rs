// kalman_core/src/types.rs

use nalgebra::DVector;

// --- Core Type Aliases ---
/// The state estimate `x̂` (N×1).
pub type State = DVector<f64>;
/// A measurement vector `y` (M×1).
pub type Observation = DVector<f64>;
