// kalman_core/src/error.rs

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KalmanError>;

/// Everything that can go wrong while building a steady-state filter.
///
/// The runtime operations (`predict`, `correct`) never fail, so every variant
/// here surfaces at construction time.
#[derive(Debug, Error)]
pub enum KalmanError {
    /// The dual PBH test failed: some unstable mode of `A` is invisible to `C`.
    #[error("the system passed to the Kalman filter is not observable")]
    NotObservable,

    #[error("dimension mismatch for {name}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        name: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("discretization timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("standard deviation {index} of {name} must be non-negative and finite, got {value}")]
    InvalidStdDev {
        name: &'static str,
        index: usize,
        value: f64,
    },

    #[error("system must have at least one state and one output, got {states} states and {outputs} outputs")]
    EmptySystem { states: usize, outputs: usize },

    /// `exp(A·dt)` overflowed, usually a fast unstable mode over a long `dt`.
    #[error("discretized system contains non-finite values (dt = {dt})")]
    NonFiniteDiscretization { dt: f64 },

    #[error("taylor series order must be at least 1, got {0}")]
    InvalidTaylorOrder(usize),

    #[error("riccati solver failed: {0}")]
    Riccati(#[from] RiccatiError),

    /// `S = CPCᵀ + R` could not be factorized, so no gain exists.
    #[error("innovation covariance is singular")]
    SingularInnovation,

    #[error("failed to parse filter configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Failures reported by a [`crate::estimation::riccati::RiccatiSolver`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiccatiError {
    #[error("R must be symmetric positive definite")]
    RNotPositiveDefinite,

    #[error("riccati inputs have inconsistent dimensions")]
    DimensionMismatch,

    #[error("doubling iteration {iteration} hit a singular matrix")]
    Singular { iteration: usize },

    #[error("doubling iteration {iteration} produced non-finite values")]
    Diverged { iteration: usize },

    #[error("no convergence after {iterations} iterations (last relative change {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },
}
