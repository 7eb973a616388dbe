// kalman_core/src/models/covariance.rs

use nalgebra::{DMatrix, DVector};

/// Creates a covariance matrix from the given standard deviations.
///
/// Each element is squared and placed on the diagonal. For a Q matrix the
/// elements are the standard deviations of each state from how the model
/// behaves; for an R matrix they are the standard deviations of each output
/// measurement.
pub fn make_cov_matrix(std_devs: &[f64]) -> DMatrix<f64> {
    let variances = DVector::from_iterator(std_devs.len(), std_devs.iter().map(|s| s.powi(2)));
    DMatrix::from_diagonal(&variances)
}

/// Forces `(X + Xᵀ) / 2`.
/// Tiny numerical errors can make a covariance slightly non-symmetric.
pub fn symmetrize(m: &DMatrix<f64>) -> DMatrix<f64> {
    (m + m.transpose()) * 0.5
}
