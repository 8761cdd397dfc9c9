use nalgebra::{SMatrix, SVector};

use crate::types::{SigmaPoints, Weights};

/// Recombine transformed sigma points into a mean and covariance.
///
/// `sigmas` holds one `N`-dimensional point per column; `wm` and `wc` carry
/// one weight per column.
pub fn unscented_transform<const N: usize>(
    sigmas: &SigmaPoints<N>,
    wm: &Weights,
    wc: &Weights,
) -> (SVector<f64, N>, SMatrix<f64, N, N>) {
    // Weighted mean
    let mean: SVector<f64, N> = sigmas * wm;

    // Weighted covariance
    let mut cov = SMatrix::<f64, N, N>::zeros();
    for (i, sigma) in sigmas.column_iter().enumerate() {
        let residual = sigma - mean;
        cov += residual * residual.transpose() * wc[i];
    }

    (mean, cov)
}
