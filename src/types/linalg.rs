//! Linear algebra type system for the state estimator
//!
//! Provides compile-time dimension checking and clean type aliases
//! shared by the filter core and its numerical collaborators.

use nalgebra::{Const, DVector, Dyn, OMatrix, SMatrix, SVector};

// ===== Filter Dimensions =====
// S = states, I = inputs, O = outputs (measurement rows)

pub type StateVec<const S: usize> = SVector<f64, S>;
pub type StateMat<const S: usize> = SMatrix<f64, S, S>;
pub type InputVec<const I: usize> = SVector<f64, I>;
pub type OutputVec<const O: usize> = SVector<f64, O>;
pub type OutputMat<const O: usize> = SMatrix<f64, O, O>;

// ===== Sigma Point Types (for UKF) =====

/// Sigma points stored column-wise: `R` rows by `2S + 1` columns.
///
/// The column count is only known at run time because stable const
/// generics cannot express `2 * S + 1` in a type.
pub type SigmaPoints<const R: usize> = OMatrix<f64, Const<R>, Dyn>;

/// Mean or covariance recombination weights, one entry per sigma point.
pub type Weights = DVector<f64>;

/// Number of sigma points for a state of dimension `states`.
pub const fn sigma_count(states: usize) -> usize {
    2 * states + 1
}

/// Zero-filled sigma point matrix with `cols` columns.
pub fn zero_sigmas<const R: usize>(cols: usize) -> SigmaPoints<R> {
    SigmaPoints::<R>::zeros_generic(Const::<R>, Dyn(cols))
}

/// Copy a fixed-size square matrix into a heap matrix for decompositions
/// whose dimension bounds cannot be met by a generic `Const<S>`.
pub fn to_dynamic<const R: usize, const C: usize>(m: &SMatrix<f64, R, C>) -> nalgebra::DMatrix<f64> {
    nalgebra::DMatrix::from_column_slice(R, C, m.as_slice())
}

/// Inverse of [`to_dynamic`]. The caller guarantees the shape.
pub fn from_dynamic<const R: usize, const C: usize>(m: &nalgebra::DMatrix<f64>) -> SMatrix<f64, R, C> {
    SMatrix::<f64, R, C>::from_column_slice(m.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_count() {
        assert_eq!(sigma_count(1), 3);
        assert_eq!(sigma_count(15), 31);
    }

    #[test]
    fn test_zero_sigmas_shape() {
        let sigmas = zero_sigmas::<3>(7);
        assert_eq!(sigmas.nrows(), 3);
        assert_eq!(sigmas.ncols(), 7);
        assert!(sigmas.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_dynamic_roundtrip_keeps_layout() {
        let m = SMatrix::<f64, 2, 3>::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let d = to_dynamic(&m);
        assert_eq!(d[(1, 2)], 6.0);
        assert_eq!(d[(0, 1)], 2.0);
        let back: SMatrix<f64, 2, 3> = from_dynamic(&d);
        assert_eq!(back, m);
    }
}
