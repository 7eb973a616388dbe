// kalman_core/src/estimation/stabilizability.rs

use nalgebra::{Complex, DMatrix};
use num_traits::Zero;

/// Popov-Belevitch-Hautus test for stabilizability of the discrete pair `(A, B)`.
///
/// Every eigenvalue `λ` of `A` with `|λ| ≥ 1` (an unstable or marginal mode)
/// must satisfy `rank([λI - A | B]) = N`. Stable modes are skipped.
///
/// Calling it with `(Aᵀ, Cᵀ)` tests detectability of `(A, C)`; see [`is_detectable`].
pub fn is_stabilizable(a: &DMatrix<f64>, b: &DMatrix<f64>) -> bool {
    let n = a.nrows();
    let inputs = b.ncols();

    let a_complex = a.map(|v| Complex::new(v, 0.0));
    let b_complex = b.map(|v| Complex::new(v, 0.0));

    for lambda in a.complex_eigenvalues().iter() {
        if lambda.norm_sqr() < 1.0 {
            continue;
        }

        let mut e = DMatrix::<Complex<f64>>::from_element(n, n + inputs, Complex::zero());
        e.view_mut((0, 0), (n, n))
            .copy_from(&(DMatrix::from_diagonal_element(n, n, *lambda) - &a_complex));
        e.view_mut((0, n), (n, inputs)).copy_from(&b_complex);

        if numerical_rank(&e) < n {
            return false;
        }
    }
    true
}

/// Dual of [`is_stabilizable`]: every unstable mode of `A` is visible through `C`.
pub fn is_detectable(a: &DMatrix<f64>, c: &DMatrix<f64>) -> bool {
    is_stabilizable(&a.transpose(), &c.transpose())
}

/// Singular values below `RANK_TOLERANCE · σ_max` count as zero. The
/// eigenvalues carry rounding error from the Schur iteration, so `λI - A` is
/// only ever numerically singular.
const RANK_TOLERANCE: f64 = 1e-10;

fn numerical_rank(m: &DMatrix<Complex<f64>>) -> usize {
    let singular_values = m.singular_values();
    let sigma_max = singular_values.iter().cloned().fold(0.0, f64::max);
    if sigma_max == 0.0 {
        return 0;
    }

    let threshold = RANK_TOLERANCE * sigma_max;
    singular_values.iter().filter(|&&s| s > threshold).count()
}
