// kalman_core/src/estimation/filters/steady_state.rs

use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix};

use crate::config::FilterConfig;
use crate::error::{KalmanError, Result};
use crate::estimation::discretization::{discretize_a, discretize_r};
use crate::estimation::riccati::RiccatiSolver;
use crate::estimation::stabilizability::is_detectable;
use crate::estimation::StateEstimator;
use crate::models::covariance::make_cov_matrix;
use crate::types::{Observation, State};

/// A Kalman filter with a constant, steady-state gain.
///
/// A Kalman filter combines predictions from a model and measurements to give
/// an estimate of the true system state. This is useful because many states
/// cannot be measured directly, either because of sensor noise or because the
/// state is "hidden".
///
/// The gain `K` weights the measurement residual against the model. For a
/// time-invariant system sampled at a fixed period the optimal gain converges
/// to a constant, so it is computed once here from the DARE and only the state
/// estimate `x̂` changes afterwards.
///
/// The model is homogeneous: there is no control input.
#[derive(Debug, Clone)]
pub struct SteadyStateKalmanFilter {
    /// Continuous system matrix (process model), N×N.
    a: DMatrix<f64>,
    /// Measurement matrix (measurement model), M×N.
    c: DMatrix<f64>,
    /// Nominal discretization timestep (seconds).
    dt: f64,
    /// `A` discretized for the nominal timestep.
    disc_a_nominal: DMatrix<f64>,
    /// Steady-state a-priori error covariance from the DARE.
    p: DMatrix<f64>,
    /// Innovation covariance `S = CPCᵀ + R`.
    s: DMatrix<f64>,
    /// The steady-state Kalman gain matrix, N×M.
    k: DMatrix<f64>,
    /// The state estimate.
    x_hat: State,
}

impl SteadyStateKalmanFilter {
    /// Constructs a state-space observer for the given plant with the default
    /// discretization and Riccati solver.
    ///
    /// # Arguments
    /// * `a`: Continuous system matrix (process model), N×N.
    /// * `c`: Measurement matrix (measurement model), M×N.
    /// * `state_std_devs`: Standard deviations of the N model states.
    /// * `measurement_std_devs`: Standard deviations of the M measurements.
    /// * `dt`: Nominal discretization timestep (seconds).
    ///
    /// # Errors
    /// [`KalmanError::NotObservable`] if an unstable mode of the discretized
    /// system is invisible to `C`; solver and validation failures otherwise.
    pub fn new(
        a: DMatrix<f64>,
        c: DMatrix<f64>,
        state_std_devs: &[f64],
        measurement_std_devs: &[f64],
        dt: f64,
    ) -> Result<Self> {
        let config = FilterConfig::new(state_std_devs.to_vec(), measurement_std_devs.to_vec(), dt);
        Self::from_config(a, c, &config)
    }

    /// Constructs the filter with the DARE solver described by `config.riccati`.
    pub fn from_config(a: DMatrix<f64>, c: DMatrix<f64>, config: &FilterConfig) -> Result<Self> {
        let solver = config.riccati;
        Self::with_solver(a, c, config, &solver)
    }

    /// Constructs the filter using an arbitrary Riccati solver.
    pub fn with_solver<S: RiccatiSolver + ?Sized>(
        a: DMatrix<f64>,
        c: DMatrix<f64>,
        config: &FilterConfig,
        solver: &S,
    ) -> Result<Self> {
        config.validate()?;
        let (states, outputs) = check_dimensions(&a, &c, config)?;
        debug!(
            "building steady-state Kalman filter: {} states, {} outputs, dt = {}, {:?} discretization",
            states, outputs, config.dt, config.discretization
        );

        let cont_q = make_cov_matrix(&config.state_std_devs);
        let cont_r = make_cov_matrix(&config.measurement_std_devs);

        let disc = config
            .discretization
            .discretize(&a, &cont_q, config.dt, config.taylor_order);
        let disc_r = discretize_r(&cont_r, config.dt);
        if !(is_finite(&disc.a) && is_finite(&disc.q) && is_finite(&disc_r)) {
            warn!("discretization with dt = {} produced non-finite values", config.dt);
            return Err(KalmanError::NonFiniteDiscretization { dt: config.dt });
        }

        // is_stabilizable(Aᵀ, Cᵀ) tells us whether the system is observable.
        if !is_detectable(&disc.a, &c) {
            warn!("the system passed to the Kalman filter is not observable");
            return Err(KalmanError::NotObservable);
        }

        let p = solver.solve(&disc.a.transpose(), &c.transpose(), &disc.q, &disc_r)?;

        // S = CPCᵀ + R
        let s = &c * &p * c.transpose() + &disc_r;

        // K = PCᵀS⁻¹ is put into Ax = b form to avoid the inverse:
        // KS = PCᵀ  =>  SᵀKᵀ = CPᵀ  =>  K = (Sᵀ.solve(CPᵀ))ᵀ
        let k = solve_symmetric(&s.transpose(), &(&c * p.transpose()))
            .ok_or(KalmanError::SingularInnovation)?
            .transpose();

        Ok(Self {
            a,
            c,
            dt: config.dt,
            disc_a_nominal: disc.a,
            p,
            s,
            k,
            x_hat: State::zeros(states),
        })
    }

    // --- Accessors ---

    /// Returns the steady-state Kalman gain matrix K.
    pub fn k(&self) -> &DMatrix<f64> {
        &self.k
    }

    /// Returns the element of K at row `i`, column `j`.
    pub fn k_entry(&self, i: usize, j: usize) -> f64 {
        self.k[(i, j)]
    }

    /// Returns the state estimate x-hat.
    pub fn x_hat(&self) -> &State {
        &self.x_hat
    }

    /// Returns row `i` of x-hat.
    pub fn x_hat_entry(&self, i: usize) -> f64 {
        self.x_hat[i]
    }

    /// Overwrites the state estimate, e.g. to initialize it.
    pub fn set_x_hat(&mut self, x_hat: State) {
        assert_eq!(x_hat.nrows(), self.x_hat.nrows(), "x_hat dimension mismatch");
        self.x_hat = x_hat;
    }

    /// Overwrites one element of the state estimate.
    pub fn set_x_hat_entry(&mut self, i: usize, value: f64) {
        self.x_hat[i] = value;
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    pub fn innovation_covariance(&self) -> &DMatrix<f64> {
        &self.s
    }

    pub fn disc_a_nominal(&self) -> &DMatrix<f64> {
        &self.disc_a_nominal
    }

    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    pub fn c(&self) -> &DMatrix<f64> {
        &self.c
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    // --- Estimation Steps ---

    /// Sets the state estimate to zero.
    pub fn reset(&mut self) {
        self.x_hat.fill(0.0);
    }

    /// Projects the model `dt` seconds into the future.
    ///
    /// A is re-discretized for this call, so prefer [`Self::predict`] when the
    /// timestep equals the nominal one.
    pub fn predict_dt(&mut self, dt: f64) {
        let disc_a = discretize_a(&self.a, dt);
        self.x_hat = disc_a * &self.x_hat;
    }

    /// Projects the model one nominal timestep into the future.
    pub fn predict(&mut self) {
        self.x_hat = &self.disc_a_nominal * &self.x_hat;
    }

    /// Corrects the state estimate x-hat using the measurements in `y`.
    pub fn correct(&mut self, y: &Observation) {
        assert_eq!(y.nrows(), self.c.nrows(), "measurement dimension mismatch");
        // x̂ₖ₊₁⁺ = x̂ₖ₊₁⁻ + K(y − Cx̂ₖ₊₁⁻)
        let innovation = y - &self.c * &self.x_hat;
        self.x_hat += &self.k * innovation;
    }
}

impl StateEstimator for SteadyStateKalmanFilter {
    fn predict(&mut self) {
        SteadyStateKalmanFilter::predict(self);
    }

    fn correct(&mut self, y: &Observation) {
        SteadyStateKalmanFilter::correct(self, y);
    }

    fn get_state(&self) -> &State {
        &self.x_hat
    }

    fn reset(&mut self) {
        SteadyStateKalmanFilter::reset(self);
    }
}

/// Validates `A` and `C` against each other and against the noise vectors.
/// Returns `(states, outputs)`.
fn check_dimensions(
    a: &DMatrix<f64>,
    c: &DMatrix<f64>,
    config: &FilterConfig,
) -> Result<(usize, usize)> {
    let states = a.nrows();
    let outputs = c.nrows();
    if states == 0 || outputs == 0 {
        return Err(KalmanError::EmptySystem { states, outputs });
    }

    let checks = [
        ("A", (states, states), a.shape()),
        ("C", (outputs, states), c.shape()),
        (
            "state_std_devs",
            (states, 1),
            (config.state_std_devs.len(), 1),
        ),
        (
            "measurement_std_devs",
            (outputs, 1),
            (config.measurement_std_devs.len(), 1),
        ),
    ];
    for (name, expected, actual) in checks {
        if expected != actual {
            return Err(KalmanError::DimensionMismatch {
                name,
                expected,
                actual,
            });
        }
    }
    Ok((states, outputs))
}

fn is_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}

/// Solves `S·X = B` for symmetric `S` without forming `S⁻¹`.
/// Falls back to partial-pivot LU if `S` is numerically indefinite.
fn solve_symmetric(s: &DMatrix<f64>, b: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    match Cholesky::new(s.clone()) {
        Some(chol) => Some(chol.solve(b)),
        None => s.clone().lu().solve(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RiccatiError;
    use crate::estimation::discretization::{discretize_aq_taylor, DiscretizationMethod};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::DVector;

    fn scalar_filter() -> SteadyStateKalmanFilter {
        SteadyStateKalmanFilter::new(
            DMatrix::from_element(1, 1, -1.0),
            DMatrix::from_element(1, 1, 1.0),
            &[0.1],
            &[0.1],
            0.01,
        )
        .unwrap()
    }

    fn position_velocity() -> (DMatrix<f64>, DMatrix<f64>) {
        let a = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, -0.1]);
        let c = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        (a, c)
    }

    /// Always returns the same covariance, so the gain math can be checked by hand.
    struct FixedSolution(DMatrix<f64>);

    impl RiccatiSolver for FixedSolution {
        fn solve(
            &self,
            _a: &DMatrix<f64>,
            _b: &DMatrix<f64>,
            _q: &DMatrix<f64>,
            _r: &DMatrix<f64>,
        ) -> std::result::Result<DMatrix<f64>, RiccatiError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSolver;

    impl RiccatiSolver for FailingSolver {
        fn solve(
            &self,
            _a: &DMatrix<f64>,
            _b: &DMatrix<f64>,
            _q: &DMatrix<f64>,
            _r: &DMatrix<f64>,
        ) -> std::result::Result<DMatrix<f64>, RiccatiError> {
            Err(RiccatiError::NotConverged {
                iterations: 0,
                residual: f64::INFINITY,
            })
        }
    }

    #[test]
    fn test_starts_at_zero() {
        let filter = scalar_filter();
        assert_eq!(filter.x_hat(), &DVector::zeros(1));
        assert_eq!(filter.k().shape(), (1, 1));
    }

    #[test]
    fn test_gain_matches_scalar_riccati_closed_form() {
        let filter = scalar_filter();

        let disc = discretize_aq_taylor(
            &DMatrix::from_element(1, 1, -1.0),
            &DMatrix::from_element(1, 1, 0.01),
            0.01,
        );
        let (a, q, r) = (disc.a[(0, 0)], disc.q[(0, 0)], 0.01 / 0.01);

        // p = a²pr/(p + r) + q  =>  p² + p(r - a²r - q) - qr = 0
        let b = r - a * a * r - q;
        let p = (-b + (b * b + 4.0 * q * r).sqrt()) / 2.0;
        let k = p / (p + r);

        assert_relative_eq!(filter.covariance()[(0, 0)], p, max_relative = 1e-9);
        assert_relative_eq!(filter.k_entry(0, 0), k, max_relative = 1e-9);
        assert_relative_eq!(filter.innovation_covariance()[(0, 0)], p + r, max_relative = 1e-9);
    }

    #[test]
    fn test_gain_from_injected_solver() {
        let (a, c) = position_velocity();
        let p = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let config = FilterConfig::new(vec![0.1, 0.1], vec![0.2], 0.5);
        let filter =
            SteadyStateKalmanFilter::with_solver(a, c, &config, &FixedSolution(p.clone())).unwrap();

        // R_d = 0.04 / 0.5, S = p00 + R_d, K = P·Cᵀ / S
        let s = 2.0 + 0.08;
        assert_relative_eq!(filter.innovation_covariance()[(0, 0)], s, max_relative = 1e-14);
        assert_relative_eq!(filter.k_entry(0, 0), 2.0 / s, max_relative = 1e-14);
        assert_relative_eq!(filter.k_entry(1, 0), 0.5 / s, max_relative = 1e-14);
    }

    #[test]
    fn test_solver_failure_propagates() {
        let (a, c) = position_velocity();
        let config = FilterConfig::new(vec![0.1, 0.1], vec![0.2], 0.01);
        let err = SteadyStateKalmanFilter::with_solver(a, c, &config, &FailingSolver).unwrap_err();
        assert!(matches!(
            err,
            KalmanError::Riccati(RiccatiError::NotConverged { .. })
        ));
    }

    #[test]
    fn test_unobservable_system_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, 2.0]);
        let c = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let err = SteadyStateKalmanFilter::new(a, c, &[0.1, 0.1], &[0.1], 0.01).unwrap_err();
        assert!(matches!(err, KalmanError::NotObservable));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let (a, _) = position_velocity();
        let c = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]);
        let err = SteadyStateKalmanFilter::new(a.clone(), c, &[0.1, 0.1], &[0.1], 0.01).unwrap_err();
        assert!(matches!(err, KalmanError::DimensionMismatch { name: "C", .. }));

        let c = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let err = SteadyStateKalmanFilter::new(a, c, &[0.1], &[0.1], 0.01).unwrap_err();
        assert!(matches!(
            err,
            KalmanError::DimensionMismatch { name: "state_std_devs", expected: (2, 1), actual: (1, 1) }
        ));
    }

    #[test]
    fn test_invalid_timestep_is_rejected() {
        let (a, c) = position_velocity();
        let err = SteadyStateKalmanFilter::new(a, c, &[0.1, 0.1], &[0.1], -0.01).unwrap_err();
        assert!(matches!(err, KalmanError::InvalidTimestep(_)));
    }

    #[test]
    fn test_overflowing_discretization_is_rejected() {
        let a = DMatrix::from_row_slice(2, 2, &[50.0, 1.0, -3.0, 60.0]);
        let c = DMatrix::from_row_slice(1, 2, &[1.0, 0.0]);
        let err = SteadyStateKalmanFilter::new(a.clone(), c.clone(), &[0.1, 0.1], &[0.1], 100.0)
            .unwrap_err();
        assert!(matches!(err, KalmanError::NonFiniteDiscretization { .. }));

        let config = FilterConfig::new(vec![0.1, 0.1], vec![0.1], 100.0)
            .with_discretization(DiscretizationMethod::VanLoan);
        let err = SteadyStateKalmanFilter::from_config(a, c, &config).unwrap_err();
        assert!(matches!(err, KalmanError::NonFiniteDiscretization { .. }));
    }

    #[test]
    fn test_empty_system_is_rejected() {
        let err = SteadyStateKalmanFilter::new(DMatrix::zeros(0, 0), DMatrix::zeros(0, 0), &[], &[], 0.01)
            .unwrap_err();
        assert!(matches!(err, KalmanError::EmptySystem { states: 0, outputs: 0 }));

        let err = SteadyStateKalmanFilter::new(
            DMatrix::from_element(1, 1, -1.0),
            DMatrix::zeros(0, 1),
            &[0.1],
            &[],
            0.01,
        )
        .unwrap_err();
        assert!(matches!(err, KalmanError::EmptySystem { states: 1, outputs: 0 }));
    }

    #[test]
    fn test_predict_with_nominal_dt_matches_predict() {
        let (a, c) = position_velocity();
        let mut nominal = SteadyStateKalmanFilter::new(a, c, &[0.1, 0.2], &[0.05], 0.02).unwrap();
        nominal.set_x_hat(DVector::from_vec(vec![1.0, -0.5]));
        let mut explicit = nominal.clone();

        for _ in 0..10 {
            nominal.predict();
            explicit.predict_dt(0.02);
        }
        assert_abs_diff_eq!(nominal.x_hat().clone(), explicit.x_hat().clone(), epsilon = 1e-14);
    }

    #[test]
    fn test_predict_dt_uses_the_given_timestep() {
        let (a, c) = position_velocity();
        let mut filter = SteadyStateKalmanFilter::new(a, c, &[0.1, 0.2], &[0.05], 0.02).unwrap();
        filter.set_x_hat(DVector::from_vec(vec![0.0, 1.0]));
        filter.predict_dt(1.0);
        // x = ∫ e^{-0.1t} dt, v = e^{-0.1}
        assert_relative_eq!(filter.x_hat_entry(0), (1.0 - (-0.1f64).exp()) / 0.1, max_relative = 1e-12);
        assert_relative_eq!(filter.x_hat_entry(1), (-0.1f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn test_correct_applies_gain_to_residual() {
        let mut filter = scalar_filter();
        filter.set_x_hat_entry(0, 0.25);
        let k = filter.k_entry(0, 0);
        filter.correct(&DVector::from_element(1, 1.0));
        assert_relative_eq!(filter.x_hat_entry(0), 0.25 + k * 0.75, max_relative = 1e-15);
    }

    #[test]
    fn test_reset_restores_zero() {
        let mut filter = scalar_filter();
        for _ in 0..20 {
            filter.predict();
            filter.correct(&DVector::from_element(1, 3.0));
        }
        assert!(filter.x_hat_entry(0) != 0.0);
        filter.reset();
        assert_eq!(filter.x_hat(), &DVector::zeros(1));
    }

    #[test]
    fn test_van_loan_and_taylor_filters_agree() {
        let (a, c) = position_velocity();
        let config = FilterConfig::new(vec![0.1, 0.3], vec![0.05], 0.005);
        let taylor = SteadyStateKalmanFilter::from_config(a.clone(), c.clone(), &config).unwrap();
        let van_loan = SteadyStateKalmanFilter::from_config(
            a,
            c,
            &config.with_discretization(DiscretizationMethod::VanLoan),
        )
        .unwrap();
        assert_relative_eq!(taylor.k().clone(), van_loan.k().clone(), max_relative = 1e-6);
    }

    #[test]
    fn test_usable_as_trait_object() {
        let mut estimator: Box<dyn StateEstimator> = Box::new(scalar_filter());
        estimator.predict();
        estimator.correct(&DVector::from_element(1, 1.0));
        assert!(estimator.get_state()[0] > 0.0);
        estimator.reset();
        assert_eq!(estimator.get_state()[0], 0.0);
    }

    #[test]
    #[should_panic(expected = "x_hat dimension mismatch")]
    fn test_set_x_hat_checks_dimension() {
        let mut filter = scalar_filter();
        filter.set_x_hat(DVector::zeros(2));
    }
}
