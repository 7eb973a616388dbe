// kalman_core/src/estimation/riccati.rs

use log::{debug, trace};
use nalgebra::{Cholesky, DMatrix};
use serde::{Deserialize, Serialize};

use crate::error::RiccatiError;
use crate::models::covariance::symmetrize;

/// The contract for any discrete algebraic Riccati equation (DARE) solver.
///
/// Returns the symmetric positive semi-definite `X` satisfying
/// `X = AᵀXA - AᵀXB(R + BᵀXB)⁻¹BᵀXA + Q`.
///
/// # Preconditions
/// * `(A, B)` is stabilizable.
/// * `R` (M×M) is symmetric positive definite, `Q` (N×N) symmetric positive semi-definite.
///
/// A steady-state estimator solves the dual problem, passing `(Aᵀ, Cᵀ, Q, R)`.
pub trait RiccatiSolver {
    fn solve(
        &self,
        a: &DMatrix<f64>,
        b: &DMatrix<f64>,
        q: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, RiccatiError>;
}

/// Structure-preserving doubling algorithm for the DARE.
///
/// Starting from `A₀ = A`, `G₀ = BR⁻¹Bᵀ`, `H₀ = Q`, each step computes
/// `W = I + GₖHₖ` and
/// ```text
/// Aₖ₊₁ = Aₖ W⁻¹ Aₖ
/// Gₖ₊₁ = Gₖ + Aₖ W⁻¹ Gₖ Aₖᵀ
/// Hₖ₊₁ = Hₖ + Aₖᵀ Hₖ W⁻¹ Aₖ
/// ```
/// `Hₖ` converges quadratically to the stabilizing solution. Iteration stops
/// once the relative Frobenius change of `Hₖ` drops to `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoublingSolver {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for DoublingSolver {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-12,
        }
    }
}

impl RiccatiSolver for DoublingSolver {
    fn solve(
        &self,
        a: &DMatrix<f64>,
        b: &DMatrix<f64>,
        q: &DMatrix<f64>,
        r: &DMatrix<f64>,
    ) -> Result<DMatrix<f64>, RiccatiError> {
        let n = a.nrows();
        let m = b.ncols();
        if a.ncols() != n
            || b.nrows() != n
            || q.shape() != (n, n)
            || r.shape() != (m, m)
        {
            return Err(RiccatiError::DimensionMismatch);
        }

        let r_chol = Cholesky::new(symmetrize(r)).ok_or(RiccatiError::RNotPositiveDefinite)?;

        let identity = DMatrix::<f64>::identity(n, n);
        let mut a_k = a.clone();
        let mut g_k = symmetrize(&(b * r_chol.solve(&b.transpose())));
        let mut h_k = symmetrize(q);

        let mut residual = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            let w = &identity + &g_k * &h_k;
            let lu = w.lu();
            let w_inv_a = lu
                .solve(&a_k)
                .ok_or(RiccatiError::Singular { iteration })?;
            let w_inv_g = lu
                .solve(&g_k)
                .ok_or(RiccatiError::Singular { iteration })?;

            let a_t = a_k.transpose();
            let h_next = symmetrize(&(&h_k + &a_t * &h_k * &w_inv_a));
            let g_next = symmetrize(&(&g_k + &a_k * w_inv_g * &a_t));
            a_k = &a_k * w_inv_a;

            if h_next.iter().any(|v| !v.is_finite()) {
                return Err(RiccatiError::Diverged { iteration });
            }

            residual = (&h_next - &h_k).norm() / h_next.norm().max(f64::MIN_POSITIVE);
            trace!("doubling iteration {}: relative change {:e}", iteration, residual);

            g_k = g_next;
            h_k = h_next;

            if residual <= self.tolerance {
                debug!("DARE converged after {} doubling iterations", iteration);
                return Ok(h_k);
            }
        }

        Err(RiccatiError::NotConverged {
            iterations: self.max_iterations,
            residual,
        })
    }
}
