use nalgebra::DMatrix;

use crate::types::{
    from_dynamic, sigma_count, to_dynamic, zero_sigmas, SigmaPoints, StateMat, StateVec, Weights,
};

/// Source of sigma points and their recombination weights for an `S`-state filter.
pub trait SigmaPointGenerator<const S: usize> {
    /// Number of sigma points, `2S + 1`.
    fn num_sigmas(&self) -> usize {
        sigma_count(S)
    }

    /// Sigma points for the distribution `(x, P)`, one point per column.
    fn sigma_points(&self, x: &StateVec<S>, p: &StateMat<S>) -> SigmaPoints<S>;

    /// Mean weights.
    fn wm(&self) -> &Weights;

    /// Covariance weights.
    fn wc(&self) -> &Weights;

    /// Single covariance weight.
    fn wc_at(&self, i: usize) -> f64 {
        self.wc()[i]
    }
}

/// Van der Merwe scaled sigma points.
///
/// Reference: R. Van der Merwe, "Sigma-Point Kalman Filters for Probabilistic
/// Inference in Dynamic State-Space Models" (2004).
#[derive(Clone, Debug)]
pub struct MerweScaledSigmaPoints<const S: usize> {
    /// Spread of sigma points around the mean (typically 1e-3)
    alpha: f64,
    /// Prior knowledge of the distribution (2.0 for Gaussian)
    beta: f64,
    /// Secondary scaling (3 - S by default)
    kappa: f64,

    wm: Weights,
    wc: Weights,
}

impl<const S: usize> MerweScaledSigmaPoints<S> {
    pub fn new(alpha: f64, beta: f64, kappa: f64) -> Self {
        let mut points = Self {
            alpha,
            beta,
            kappa,
            wm: Weights::zeros(sigma_count(S)),
            wc: Weights::zeros(sigma_count(S)),
        };
        points.compute_weights();
        points
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// Combined scaling parameter `lambda = alpha^2 (S + kappa) - S`.
    fn lambda(&self) -> f64 {
        let n = S as f64;
        self.alpha * self.alpha * (n + self.kappa) - n
    }

    fn compute_weights(&mut self) {
        let n = S as f64;
        let lambda = self.lambda();
        let c = 0.5 / (n + lambda);

        self.wm.fill(c);
        self.wc.fill(c);
        self.wm[0] = lambda / (n + lambda);
        self.wc[0] = lambda / (n + lambda) + (1.0 - self.alpha * self.alpha + self.beta);
    }
}

impl<const S: usize> Default for MerweScaledSigmaPoints<S> {
    fn default() -> Self {
        Self::new(1e-3, 2.0, 3.0 - S as f64)
    }
}

impl<const S: usize> SigmaPointGenerator<S> for MerweScaledSigmaPoints<S> {
    fn sigma_points(&self, x: &StateVec<S>, p: &StateMat<S>) -> SigmaPoints<S> {
        let scaled_cov = p * (self.lambda() + S as f64);
        let root = square_root(&scaled_cov);

        let mut sigmas = zero_sigmas::<S>(self.num_sigmas());

        // Sigma point 0: mean
        sigmas.set_column(0, x);

        // Points 1..=S: mean + column k, points S+1..=2S: mean - column k
        for k in 0..S {
            let offset = root.column(k);
            sigmas.set_column(k + 1, &(x + &offset));
            sigmas.set_column(S + k + 1, &(x - &offset));
        }

        sigmas
    }

    fn wm(&self) -> &Weights {
        &self.wm
    }

    fn wc(&self) -> &Weights {
        &self.wc
    }
}

/// Matrix square root `L` with `L * L^T = m`.
///
/// Lower Cholesky factor when `m` is positive definite. Otherwise a symmetric
/// eigen square root with negative eigenvalues clamped to zero, which keeps a
/// zero or merely semi-definite covariance usable. Non-finite input yields NaN.
fn square_root<const S: usize>(m: &StateMat<S>) -> StateMat<S> {
    if let Some(chol) = (*m).cholesky() {
        return chol.l();
    }

    if m.iter().any(|v| !v.is_finite()) {
        log::debug!("[UKF] non-finite covariance, sigma points will be NaN");
        return StateMat::<S>::from_element(f64::NAN);
    }

    log::debug!("[UKF] Cholesky factorization failed, using eigen square root");
    let eigen = to_dynamic(m).symmetric_eigen();
    let sqrt_vals = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    let root = eigen.eigenvectors * DMatrix::from_diagonal(&sqrt_vals);
    from_dynamic(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3, Vector2, Vector3};

    #[test]
    fn test_num_sigmas() {
        assert_eq!(MerweScaledSigmaPoints::<1>::default().num_sigmas(), 3);
        assert_eq!(MerweScaledSigmaPoints::<4>::default().num_sigmas(), 9);
        assert_eq!(MerweScaledSigmaPoints::<4>::default().wm().len(), 9);
    }

    #[test]
    fn test_mean_weights_sum_to_one() {
        assert_abs_diff_eq!(MerweScaledSigmaPoints::<1>::default().wm().sum(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(MerweScaledSigmaPoints::<3>::default().wm().sum(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            MerweScaledSigmaPoints::<6>::new(0.5, 2.0, 0.0).wm().sum(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_center_covariance_weight() {
        let points = MerweScaledSigmaPoints::<2>::new(1.0, 2.0, 1.0);
        // lambda = 1 * (2 + 1) - 2 = 1
        assert_abs_diff_eq!(points.wm()[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(points.wc_at(0), 1.0 / 3.0 + 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(points.wc_at(4), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sigma_points_symmetric_about_mean() {
        let points = MerweScaledSigmaPoints::<2>::new(1.0, 2.0, 1.0);
        let x = Vector2::new(1.0, -2.0);
        let p = Matrix2::new(4.0, 1.0, 1.0, 2.0);
        let sigmas = points.sigma_points(&x, &p);

        assert_eq!(sigmas.ncols(), 5);
        assert_eq!(sigmas.column(0).into_owned(), x);
        for k in 0..2 {
            let plus = sigmas.column(k + 1).into_owned();
            let minus = sigmas.column(k + 3).into_owned();
            assert_abs_diff_eq!((plus + minus) * 0.5, x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sigma_points_reproduce_covariance() {
        let points = MerweScaledSigmaPoints::<3>::new(0.5, 2.0, 0.0);
        let x = Vector3::new(0.5, 1.0, 2.0);
        let p = Matrix3::new(2.0, 0.3, 0.0, 0.3, 1.0, 0.1, 0.0, 0.1, 0.5);
        let sigmas = points.sigma_points(&x, &p);

        let mut cov = Matrix3::zeros();
        for i in 0..points.num_sigmas() {
            let d = sigmas.column(i) - x;
            cov += d * d.transpose() * points.wc_at(i);
        }
        assert_abs_diff_eq!(cov, p, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_covariance_collapses_onto_mean() {
        let points = MerweScaledSigmaPoints::<2>::default();
        let x = Vector2::new(3.0, 4.0);
        let sigmas = points.sigma_points(&x, &Matrix2::zeros());

        for column in sigmas.column_iter() {
            assert_eq!(column.into_owned(), x);
        }
    }

    #[test]
    fn test_semidefinite_covariance_falls_back() {
        // Rank one: only the first axis carries uncertainty
        let points = MerweScaledSigmaPoints::<2>::new(1.0, 2.0, 1.0);
        let x = Vector2::zeros();
        let p = Matrix2::new(1.0, 0.0, 0.0, 0.0);
        let sigmas = points.sigma_points(&x, &p);

        assert!(sigmas.iter().all(|v| v.is_finite()));
        for column in sigmas.column_iter() {
            assert_abs_diff_eq!(column[1], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_finite_covariance_gives_nan_points() {
        let points = MerweScaledSigmaPoints::<2>::default();
        let p = Matrix2::new(f64::NAN, 0.0, 0.0, 1.0);
        let sigmas = points.sigma_points(&Vector2::zeros(), &p);
        assert!(sigmas.column(1).iter().any(|v| v.is_nan()));
    }
}
