use nalgebra::SMatrix;

/// Build a diagonal covariance matrix from per-channel standard deviations.
///
/// Each diagonal entry is the squared standard deviation; off-diagonals are zero.
/// Inputs are not validated (a negative std-dev squares to a positive variance).
pub fn make_cov_matrix<const N: usize>(std_devs: &[f64; N]) -> SMatrix<f64, N, N> {
    let mut cov = SMatrix::<f64, N, N>::zeros();
    for (i, &std) in std_devs.iter().enumerate() {
        cov[(i, i)] = std * std;
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_is_variance() {
        let cov = make_cov_matrix(&[0.5, 2.0, 0.0]);
        assert_eq!(cov[(0, 0)], 0.25);
        assert_eq!(cov[(1, 1)], 4.0);
        assert_eq!(cov[(2, 2)], 0.0);
    }

    #[test]
    fn test_off_diagonal_zero() {
        let cov = make_cov_matrix(&[1.0, 3.0]);
        assert_eq!(cov[(0, 1)], 0.0);
        assert_eq!(cov[(1, 0)], 0.0);
    }
}
