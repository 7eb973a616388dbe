// kalman_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::riccati::RiccatiSolver;
pub use crate::estimation::StateEstimator;
pub use crate::types::{Observation, State};

// --- Configuration and Errors ---
pub use crate::config::FilterConfig;
pub use crate::error::{KalmanError, RiccatiError};

// --- Estimation Algorithms ---
pub use crate::estimation::discretization::{
    discretize_a, discretize_aq, discretize_aq_taylor, discretize_aq_taylor_with_order,
    discretize_r, DiscreteSystem, DiscretizationMethod,
};
pub use crate::estimation::filters::steady_state::SteadyStateKalmanFilter;
pub use crate::estimation::riccati::DoublingSolver;
pub use crate::estimation::stabilizability::{is_detectable, is_stabilizable};
pub use crate::models::covariance::{make_cov_matrix, symmetrize};
