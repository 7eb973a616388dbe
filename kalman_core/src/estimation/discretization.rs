// kalman_core/src/estimation/discretization.rs

//! Continuous-to-discrete conversion of the system and noise matrices.
//!
//! Three strategies are provided for the process model:
//! * [`discretize_a`]: `exp(A·dt)` only, for re-discretizing on a varying timestep.
//! * [`discretize_aq`]: Van Loan's method, one exponential of a 2N×2N block matrix.
//! * [`discretize_aq_taylor`]: the N×N exponential plus a truncated series for
//!   the upper-right block, which is much cheaper for small `dt`.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::models::covariance::symmetrize;

/// Order of the series used by [`discretize_aq_taylor`].
pub const DEFAULT_TAYLOR_ORDER: usize = 5;

/// A discretized process model: `x[k+1] = A·x[k] + w`, `w ~ N(0, Q)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteSystem {
    pub a: DMatrix<f64>,
    pub q: DMatrix<f64>,
}

/// Selects how the process model is discretized when a filter is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscretizationMethod {
    /// [`discretize_aq_taylor_with_order`].
    #[default]
    Taylor,
    /// [`discretize_aq`].
    VanLoan,
}

impl DiscretizationMethod {
    /// Runs the selected strategy. `taylor_order` is ignored by `VanLoan`.
    pub fn discretize(
        &self,
        cont_a: &DMatrix<f64>,
        cont_q: &DMatrix<f64>,
        dt: f64,
        taylor_order: usize,
    ) -> DiscreteSystem {
        match self {
            DiscretizationMethod::Taylor => {
                discretize_aq_taylor_with_order(cont_a, cont_q, dt, taylor_order)
            }
            DiscretizationMethod::VanLoan => discretize_aq(cont_a, cont_q, dt),
        }
    }
}

/// Discretizes the given continuous A matrix: `exp(A·dt)`.
pub fn discretize_a(cont_a: &DMatrix<f64>, dt: f64) -> DMatrix<f64> {
    (cont_a * dt).exp()
}

/// Discretizes the given continuous A and Q matrices with Van Loan's method.
///
/// Builds `M = [[-A, Q], [0, Aᵀ]]`, takes `Φ = exp(M·dt)` and reads the
/// discrete matrices off its right-hand blocks: `A_d = Φ22ᵀ`, `Q_d = A_d·Φ12`.
pub fn discretize_aq(cont_a: &DMatrix<f64>, cont_q: &DMatrix<f64>, dt: f64) -> DiscreteSystem {
    let n = cont_a.nrows();

    // Make continuous Q symmetric if it isn't already
    let q = symmetrize(cont_q);

    let mut m = DMatrix::<f64>::zeros(2 * n, 2 * n);
    m.view_mut((0, 0), (n, n)).copy_from(&(-cont_a));
    m.view_mut((0, n), (n, n)).copy_from(&q);
    m.view_mut((n, n), (n, n)).copy_from(&cont_a.transpose());

    let phi = (m * dt).exp();

    // Phi12 = phi[0:n, n:2n], Phi22 = phi[n:2n, n:2n]
    let phi12 = phi.view((0, n), (n, n)).into_owned();
    let phi22 = phi.view((n, n), (n, n));

    let disc_a = phi22.transpose();
    let disc_q = symmetrize(&(&disc_a * phi12));

    DiscreteSystem {
        a: disc_a,
        q: disc_q,
    }
}

/// Discretizes the given continuous A and Q matrices using a 5th order series
/// for the noise block. See [`discretize_aq_taylor_with_order`].
pub fn discretize_aq_taylor(
    cont_a: &DMatrix<f64>,
    cont_q: &DMatrix<f64>,
    dt: f64,
) -> DiscreteSystem {
    discretize_aq_taylor_with_order(cont_a, cont_q, dt, DEFAULT_TAYLOR_ORDER)
}

/// Discretizes the given continuous A and Q matrices without the 2N×2N exponential.
///
/// The upper-right block of `exp(M·dt)` from [`discretize_aq`] has the series
/// `Φ12 = Σₖ Tₖ·dtᵏ/k!` with `T₁ = Q` and `Tₖ = -A·Tₖ₋₁ + Q·(Aᵀ)ᵏ⁻¹`.
/// Truncating it after `order` terms and pairing it with the cheap N×N
/// exponential of `A·dt` reproduces the exact result to `O(dt^(order+1))`.
///
/// # Arguments
/// * `cont_a`: Continuous system matrix (N×N).
/// * `cont_q`: Continuous process noise covariance (N×N).
/// * `dt`: Discretization timestep (seconds).
/// * `order`: Number of series terms, at least 1.
pub fn discretize_aq_taylor_with_order(
    cont_a: &DMatrix<f64>,
    cont_q: &DMatrix<f64>,
    dt: f64,
    order: usize,
) -> DiscreteSystem {
    // Make continuous Q symmetric if it isn't already
    let q = symmetrize(cont_q);
    let a_t = cont_a.transpose();

    let mut last_term = q.clone();
    let mut last_coeff = dt;

    // Aᵀⁿ
    let mut atn = a_t.clone();

    let mut phi12 = &last_term * last_coeff;

    for i in 2..=order {
        last_term = -cont_a * &last_term + &q * &atn;
        last_coeff *= dt / i as f64;

        phi12 += &last_term * last_coeff;

        atn = &atn * &a_t;
    }

    let disc_a = discretize_a(cont_a, dt);
    let disc_q = symmetrize(&(&disc_a * phi12));

    DiscreteSystem {
        a: disc_a,
        q: disc_q,
    }
}

/// Returns the discrete measurement noise covariance for the continuous `R`.
///
/// Continuous white noise has a power spectral density, so it scales with the
/// sample rate: `R_d = R / dt`.
pub fn discretize_r(cont_r: &DMatrix<f64>, dt: f64) -> DMatrix<f64> {
    cont_r / dt
}
