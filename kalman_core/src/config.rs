// kalman_core/src/config.rs

//! Construction parameters for a [`SteadyStateKalmanFilter`].
//!
//! [`SteadyStateKalmanFilter`]: crate::estimation::filters::steady_state::SteadyStateKalmanFilter

use serde::{Deserialize, Serialize};

use crate::error::{KalmanError, Result};
use crate::estimation::discretization::{DiscretizationMethod, DEFAULT_TAYLOR_ORDER};
use crate::estimation::riccati::DoublingSolver;

/// Everything except the system matrices needed to build a filter.
///
/// ```toml
/// state_std_devs = [0.1, 0.5]
/// measurement_std_devs = [0.05]
/// dt = 0.01
/// discretization = "taylor"   # or "van_loan"
/// taylor_order = 5
///
/// [riccati]
/// max_iterations = 100
/// tolerance = 1e-12
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Standard deviations of the model states (continuous process noise).
    pub state_std_devs: Vec<f64>,
    /// Standard deviations of the measurements (continuous measurement noise).
    pub measurement_std_devs: Vec<f64>,
    /// Nominal discretization timestep (seconds).
    pub dt: f64,
    #[serde(default)]
    pub discretization: DiscretizationMethod,
    #[serde(default = "default_taylor_order")]
    pub taylor_order: usize,
    #[serde(default)]
    pub riccati: DoublingSolver,
}

fn default_taylor_order() -> usize {
    DEFAULT_TAYLOR_ORDER
}

impl FilterConfig {
    pub fn new(state_std_devs: Vec<f64>, measurement_std_devs: Vec<f64>, dt: f64) -> Self {
        Self {
            state_std_devs,
            measurement_std_devs,
            dt,
            discretization: DiscretizationMethod::default(),
            taylor_order: DEFAULT_TAYLOR_ORDER,
            riccati: DoublingSolver::default(),
        }
    }

    pub fn with_discretization(mut self, method: DiscretizationMethod) -> Self {
        self.discretization = method;
        self
    }

    pub fn with_taylor_order(mut self, order: usize) -> Self {
        self.taylor_order = order;
        self
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Checks everything that does not depend on the system matrices.
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(KalmanError::InvalidTimestep(self.dt));
        }
        if self.taylor_order == 0 {
            return Err(KalmanError::InvalidTaylorOrder(self.taylor_order));
        }
        check_std_devs("state_std_devs", &self.state_std_devs)?;
        check_std_devs("measurement_std_devs", &self.measurement_std_devs)?;
        Ok(())
    }
}

fn check_std_devs(name: &'static str, std_devs: &[f64]) -> Result<()> {
    match std_devs
        .iter()
        .enumerate()
        .find(|(_, s)| !(s.is_finite() && **s >= 0.0))
    {
        Some((index, &value)) => Err(KalmanError::InvalidStdDev { name, index, value }),
        None => Ok(()),
    }
}
