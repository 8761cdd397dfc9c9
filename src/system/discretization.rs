//! Continuous-to-discrete conversion of system and noise matrices.
//!
//! The filter only consumes the discrete process noise `Qd` and the discrete
//! measurement noise `Rd`; the discrete transition matrix is returned alongside
//! `Qd` because both fall out of the same computation.

use nalgebra::DMatrix;

use crate::types::{from_dynamic, to_dynamic, OutputMat, StateMat};

/// Number of terms kept in the Taylor series for `Qd`.
const TAYLOR_ORDER: usize = 5;

/// Noise discretization strategy used by the filter core.
pub trait Discretizer {
    /// Discretize `(A, Qc)` over `dt`, returning `(Ad, Qd)`.
    fn discretize_aq<const S: usize>(
        &self,
        cont_a: &StateMat<S>,
        cont_q: &StateMat<S>,
        dt: f64,
    ) -> (StateMat<S>, StateMat<S>);

    /// Discretize the measurement noise covariance over `dt`.
    fn discretize_r<const O: usize>(&self, cont_r: &OutputMat<O>, dt: f64) -> OutputMat<O>;
}

/// Truncated Taylor series for `Qd`, matrix exponential for `Ad`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaylorDiscretizer;

impl Discretizer for TaylorDiscretizer {
    fn discretize_aq<const S: usize>(
        &self,
        cont_a: &StateMat<S>,
        cont_q: &StateMat<S>,
        dt: f64,
    ) -> (StateMat<S>, StateMat<S>) {
        discretize_aq_taylor(cont_a, cont_q, dt)
    }

    fn discretize_r<const O: usize>(&self, cont_r: &OutputMat<O>, dt: f64) -> OutputMat<O> {
        discretize_r(cont_r, dt)
    }
}

/// Van Loan block matrix exponential for both `Ad` and `Qd`.
///
/// Exact up to the accuracy of the matrix exponential, at the cost of a
/// `2S x 2S` exponential per call.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactDiscretizer;

impl Discretizer for ExactDiscretizer {
    fn discretize_aq<const S: usize>(
        &self,
        cont_a: &StateMat<S>,
        cont_q: &StateMat<S>,
        dt: f64,
    ) -> (StateMat<S>, StateMat<S>) {
        discretize_aq_exact(cont_a, cont_q, dt)
    }

    fn discretize_r<const O: usize>(&self, cont_r: &OutputMat<O>, dt: f64) -> OutputMat<O> {
        discretize_r(cont_r, dt)
    }
}

/// Discrete state transition matrix `Ad = exp(A dt)`.
pub fn discretize_a<const S: usize>(cont_a: &StateMat<S>, dt: f64) -> StateMat<S> {
    let scaled = to_dynamic(&(cont_a * dt));
    from_dynamic(&scaled.exp())
}

/// Discretize `(A, Qc)` with a 5th-order Taylor series of the Van Loan integral.
///
/// `Qd` is symmetrised before it is returned.
pub fn discretize_aq_taylor<const S: usize>(
    cont_a: &StateMat<S>,
    cont_q: &StateMat<S>,
    dt: f64,
) -> (StateMat<S>, StateMat<S>) {
    let a_t = cont_a.transpose();

    let mut last_term = *cont_q;
    let mut last_coeff = dt;
    // (A^T)^n
    let mut a_t_n = a_t;
    let mut phi12 = last_term * last_coeff;

    for i in 2..=TAYLOR_ORDER {
        last_term = -cont_a * last_term + cont_q * a_t_n;
        last_coeff *= dt / i as f64;
        phi12 += last_term * last_coeff;
        a_t_n *= a_t;
    }

    let disc_a = discretize_a(cont_a, dt);
    let q_d = disc_a * phi12;

    (disc_a, (q_d + q_d.transpose()) * 0.5)
}

/// Discretize `(A, Qc)` with the Van Loan block matrix exponential.
///
/// ```text
/// M = [-A  Qc ] * dt      exp(M) = [ .   M12 ]
///     [ 0  A^T]                    [ 0   M22 ]
/// Ad = M22^T,  Qd = Ad * M12
/// ```
pub fn discretize_aq_exact<const S: usize>(
    cont_a: &StateMat<S>,
    cont_q: &StateMat<S>,
    dt: f64,
) -> (StateMat<S>, StateMat<S>) {
    let mut m = DMatrix::<f64>::zeros(2 * S, 2 * S);
    m.view_mut((0, 0), (S, S)).copy_from(&(-cont_a * dt));
    m.view_mut((0, S), (S, S)).copy_from(&(cont_q * dt));
    m.view_mut((S, S), (S, S)).copy_from(&(cont_a.transpose() * dt));

    let phi = m.exp();
    let m12: StateMat<S> = from_dynamic(&phi.view((0, S), (S, S)).into_owned());
    let m22: StateMat<S> = from_dynamic(&phi.view((S, S), (S, S)).into_owned());

    let disc_a = m22.transpose();
    let q_d = disc_a * m12;

    (disc_a, (q_d + q_d.transpose()) * 0.5)
}

/// Discrete measurement noise `Rd = Rc / dt`.
///
/// Measurement noise is modeled as noise power over the integration interval,
/// so a shorter interval means a noisier averaged sample.
pub fn discretize_r<const O: usize>(cont_r: &OutputMat<O>, dt: f64) -> OutputMat<O> {
    cont_r / dt
}
