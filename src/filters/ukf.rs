use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::UkfConfig;
use crate::error::Result;
use crate::filters::health::assess_covariance;
use crate::system::{
    make_cov_matrix, numerical_jacobian_x, runge_kutta, Discretizer, TaylorDiscretizer,
};
use crate::types::{
    from_dynamic, to_dynamic, zero_sigmas, DynamicsFn, InputVec, MeasurementFn, OutputMat,
    OutputVec, SigmaPoints, StateMat, StateVec,
};
use crate::unscented::{unscented_transform, MerweScaledSigmaPoints, SigmaPointGenerator};

/// Serializable copy of the filter estimate
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UkfSnapshot {
    pub x_hat: Vec<f64>,
    /// Error covariance, row-major
    pub covariance: Vec<Vec<f64>>,
    /// Covariance trace for uncertainty
    pub covariance_trace: f64,
}

/// Unscented Kalman filter over `S` states, `I` inputs and `O` outputs.
///
/// The model is a continuous-time `dx/dt = f(x, u)` observed through
/// `y = h(x, u)`. Each control cycle runs one [`predict`](Self::predict)
/// followed by any number of [`correct`](Self::correct) or
/// [`correct_with`](Self::correct_with) calls. Numerical degeneracy is never
/// reported as an error; watch [`p`](Self::p) and re-seed with
/// [`reset`](Self::reset), [`set_xhat`](Self::set_xhat) or
/// [`set_p`](Self::set_p) when it diverges.
pub struct UnscentedKalmanFilter<
    const S: usize,
    const I: usize,
    const O: usize,
    P = MerweScaledSigmaPoints<S>,
    D = TaylorDiscretizer,
> {
    /// Continuous dynamics dx/dt = f(x, u)
    f: DynamicsFn<S, I>,
    /// Default measurement model
    h: MeasurementFn<S, I, O>,

    /// State estimate
    x_hat: StateVec<S>,
    /// Error covariance
    p: StateMat<S>,

    /// Continuous process noise (diagonal)
    cont_q: StateMat<S>,
    /// Continuous measurement noise (diagonal)
    cont_r: OutputMat<O>,
    /// Measurement noise discretized over the last predict interval
    disc_r: OutputMat<O>,

    /// Sigma points propagated by the last predict, one per column.
    /// Read by every correct until the next predict overwrites them.
    sigmas_f: SigmaPoints<S>,

    points: P,
    discretizer: D,

    /// Log a warning whenever P looks degenerate after an update
    conditioning_check: bool,
}

impl<const S: usize, const I: usize, const O: usize> UnscentedKalmanFilter<S, I, O> {
    /// Create a filter with Merwe scaled sigma points and Taylor series
    /// noise discretization.
    pub fn new(
        f: impl Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S> + Send + Sync + 'static,
        h: impl Fn(&StateVec<S>, &InputVec<I>) -> OutputVec<O> + Send + Sync + 'static,
        state_std_devs: &[f64; S],
        measurement_std_devs: &[f64; O],
        nominal_dt: f64,
    ) -> Self {
        Self::with_components(
            f,
            h,
            state_std_devs,
            measurement_std_devs,
            nominal_dt,
            MerweScaledSigmaPoints::default(),
            TaylorDiscretizer,
        )
    }

    /// Create a filter from a loaded configuration.
    ///
    /// Only the std-dev vector lengths are checked against `S` and `O`.
    pub fn from_config(
        f: impl Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S> + Send + Sync + 'static,
        h: impl Fn(&StateVec<S>, &InputVec<I>) -> OutputVec<O> + Send + Sync + 'static,
        config: &UkfConfig,
    ) -> Result<Self> {
        let state_std_devs = config.state_std_array::<S>()?;
        let measurement_std_devs = config.measurement_std_array::<O>()?;

        let mut filter = Self::with_components(
            f,
            h,
            &state_std_devs,
            &measurement_std_devs,
            config.nominal_dt,
            config.sigma_points.build::<S>(),
            TaylorDiscretizer,
        );
        filter.set_conditioning_check(config.conditioning_check);
        Ok(filter)
    }
}

impl<const S: usize, const I: usize, const O: usize, P, D> UnscentedKalmanFilter<S, I, O, P, D>
where
    P: SigmaPointGenerator<S>,
    D: Discretizer,
{
    /// Create a filter with an explicit sigma point generator and discretizer.
    pub fn with_components(
        f: impl Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S> + Send + Sync + 'static,
        h: impl Fn(&StateVec<S>, &InputVec<I>) -> OutputVec<O> + Send + Sync + 'static,
        state_std_devs: &[f64; S],
        measurement_std_devs: &[f64; O],
        nominal_dt: f64,
        points: P,
        discretizer: D,
    ) -> Self {
        let cont_q = make_cov_matrix(state_std_devs);
        let cont_r = make_cov_matrix(measurement_std_devs);
        let disc_r = discretizer.discretize_r(&cont_r, nominal_dt);
        let sigmas_f = zero_sigmas::<S>(points.num_sigmas());

        Self {
            f: Arc::new(f),
            h: Arc::new(h),
            x_hat: StateVec::<S>::zeros(),
            p: StateMat::<S>::zeros(),
            cont_q,
            cont_r,
            disc_r,
            sigmas_f,
            points,
            discretizer,
            conditioning_check: false,
        }
    }

    /// Time update over `dt` seconds with the input `u` held constant.
    pub fn predict(&mut self, u: &InputVec<I>, dt: f64) {
        let f = &*self.f;

        // 1. Linearize the dynamics about the current estimate
        let cont_a = numerical_jacobian_x(f, &self.x_hat, u);

        // 2. Discretize process noise (Ad is not needed here)
        let (_, disc_q) = self.discretizer.discretize_aq(&cont_a, &self.cont_q, dt);

        // 3. Generate sigma points
        let sigmas = self.points.sigma_points(&self.x_hat, &self.p);

        // 4. Propagate each point through the dynamics
        let mut sigmas_f = zero_sigmas::<S>(self.points.num_sigmas());
        for (i, sigma) in sigmas.column_iter().enumerate() {
            let propagated = runge_kutta(f, &sigma.into_owned(), u, dt);
            sigmas_f.set_column(i, &propagated);
        }

        // 5. Recombine (unscented transform)
        let (x_hat, p) = unscented_transform(&sigmas_f, self.points.wm(), self.points.wc());

        // 6. Additive process noise
        self.x_hat = x_hat;
        self.p = p + disc_q;
        self.sigmas_f = sigmas_f;

        // 7. Measurement noise follows the new interval
        self.disc_r = self.discretizer.discretize_r(&self.cont_r, dt);

        self.check_conditioning("predict");
    }

    /// Measurement update with the default measurement model and noise.
    pub fn correct(&mut self, u: &InputVec<I>, y: &OutputVec<O>) {
        let h = Arc::clone(&self.h);
        let disc_r = self.disc_r;
        self.correct_with::<O>(u, y, &*h, &disc_r);
    }

    /// Measurement update with an alternate model `h` of `R` rows and
    /// measurement noise `r`.
    ///
    /// Lets sensors of different dimensions be fused in the same cycle.
    /// The state-side spread comes from the sigma points cached by the last
    /// [`predict`](Self::predict). Before any predict they are all zero,
    /// which leaves a degenerate cross-covariance.
    pub fn correct_with<const R: usize>(
        &mut self,
        u: &InputVec<I>,
        y: &SVector<f64, R>,
        h: impl Fn(&StateVec<S>, &InputVec<I>) -> SVector<f64, R>,
        r: &SMatrix<f64, R, R>,
    ) {
        // 1. Re-sample around the current estimate, which may already hold
        //    an earlier correction from this cycle
        let sigmas = self.points.sigma_points(&self.x_hat, &self.p);

        // 2. Transform sigma points to measurement space
        let mut sigmas_h = zero_sigmas::<R>(self.points.num_sigmas());
        for (i, sigma) in sigmas.column_iter().enumerate() {
            sigmas_h.set_column(i, &h(&sigma.into_owned(), u));
        }

        // 3. Predicted measurement and innovation covariance
        let (y_hat, py) = unscented_transform(&sigmas_h, self.points.wm(), self.points.wc());
        let py = py + r;

        // 4. Cross-covariance Pxy = sum Wc(i) (Sf(i) - x_hat) (Yi - y_hat)^T
        let mut pxy = SMatrix::<f64, S, R>::zeros();
        for i in 0..self.points.num_sigmas() {
            let dx = self.sigmas_f.column(i) - self.x_hat;
            let dy = sigmas_h.column(i) - y_hat;
            pxy += dx * dy.transpose() * self.points.wc_at(i);
        }

        // 5. Kalman gain from Py^T K^T = Pxy^T
        let k = solve_gain(&py, &pxy);

        // 6. Update state and covariance
        self.x_hat += k * (y - y_hat);
        self.p -= k * py * k.transpose();

        self.check_conditioning("correct");
    }

    pub fn xhat(&self) -> &StateVec<S> {
        &self.x_hat
    }

    pub fn xhat_element(&self, i: usize) -> f64 {
        self.x_hat[i]
    }

    pub fn set_xhat(&mut self, x_hat: StateVec<S>) {
        self.x_hat = x_hat;
    }

    pub fn set_xhat_element(&mut self, i: usize, value: f64) {
        self.x_hat[i] = value;
    }

    pub fn p(&self) -> &StateMat<S> {
        &self.p
    }

    pub fn p_element(&self, i: usize, j: usize) -> f64 {
        self.p[(i, j)]
    }

    /// Overwrite the error covariance. Symmetry and positive
    /// semi-definiteness are the caller's responsibility.
    pub fn set_p(&mut self, p: StateMat<S>) {
        self.p = p;
    }

    /// Zero the estimate, covariance and cached sigma points.
    ///
    /// The model and its noise parameters are kept.
    pub fn reset(&mut self) {
        self.x_hat = StateVec::<S>::zeros();
        self.p = StateMat::<S>::zeros();
        self.sigmas_f.fill(0.0);
    }

    /// Sigma points from the last predict.
    pub fn propagated_sigmas(&self) -> &SigmaPoints<S> {
        &self.sigmas_f
    }

    pub fn continuous_q(&self) -> &StateMat<S> {
        &self.cont_q
    }

    pub fn continuous_r(&self) -> &OutputMat<O> {
        &self.cont_r
    }

    pub fn discrete_r(&self) -> &OutputMat<O> {
        &self.disc_r
    }

    pub fn sigma_points(&self) -> &P {
        &self.points
    }

    /// Enable the covariance conditioning check after every update.
    ///
    /// Findings are only logged; the filter state is never modified.
    pub fn set_conditioning_check(&mut self, enabled: bool) {
        self.conditioning_check = enabled;
    }

    pub fn snapshot(&self) -> UkfSnapshot {
        UkfSnapshot {
            x_hat: self.x_hat.iter().copied().collect(),
            covariance: self
                .p
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            covariance_trace: self.p.trace(),
        }
    }

    fn check_conditioning(&self, stage: &str) {
        if !self.conditioning_check {
            return;
        }
        let health = assess_covariance(&self.p);
        if !health.is_healthy() {
            log::warn!("[UKF] {} left a degenerate covariance: {}", stage, health.format_status());
        }
    }
}

/// Solve `Py^T K^T = Pxy^T` for the gain `K`.
///
/// Cholesky first since Py is symmetric, LU when Py is not positive
/// definite. A singular Py gives a NaN gain.
fn solve_gain<const S: usize, const R: usize>(
    py: &SMatrix<f64, R, R>,
    pxy: &SMatrix<f64, S, R>,
) -> SMatrix<f64, S, R> {
    let rhs = pxy.transpose();

    if let Some(chol) = py.transpose().cholesky() {
        return chol.solve(&rhs).transpose();
    }

    log::debug!("[UKF] innovation covariance not positive definite, using LU");
    match to_dynamic(&py.transpose()).lu().solve(&to_dynamic(&rhs)) {
        Some(k_t) => from_dynamic::<R, S>(&k_t).transpose(),
        None => SMatrix::<f64, S, R>::from_element(f64::NAN),
    }
}
