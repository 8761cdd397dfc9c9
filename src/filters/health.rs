//! Covariance conditioning check
//!
//! A read-only diagnostic over the error covariance. The filter never acts
//! on the result; it only logs, and recovery stays with the caller.

use serde::{Deserialize, Serialize};

use crate::types::{to_dynamic, StateMat};

/// Largest condition number still considered usable
pub const MAX_CONDITION_NUMBER: f64 = 1e12;

/// Relative asymmetry tolerated before P is flagged
pub const ASYMMETRY_TOLERANCE: f64 = 1e-9;

/// Snapshot of covariance health metrics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CovarianceHealth {
    /// Every entry is finite
    pub finite: bool,
    /// max |P(i,j) - P(j,i)|
    pub max_asymmetry: f64,
    /// Smallest diagonal entry (a variance, should be >= 0)
    pub min_diagonal: f64,
    /// Smallest eigenvalue of the symmetric part
    pub min_eigenvalue: f64,
    pub trace: f64,
    /// Ratio of largest to smallest absolute eigenvalue
    pub condition_number: f64,
}

impl CovarianceHealth {
    pub fn is_healthy(&self) -> bool {
        let scale = self.trace.abs().max(1.0);
        self.finite
            && self.max_asymmetry <= ASYMMETRY_TOLERANCE * scale
            && self.min_diagonal >= 0.0
            && self.min_eigenvalue >= -ASYMMETRY_TOLERANCE * scale
            && self.condition_number <= MAX_CONDITION_NUMBER
    }

    /// Format health status for logging
    pub fn format_status(&self) -> String {
        if !self.finite {
            return "Covariance ✗ (non-finite entries)".to_string();
        }
        let status = if self.is_healthy() { "✓" } else { "⚠" };
        format!(
            "Covariance {} | trace {:.3e} | min diag {:.3e} | min eig {:.3e} | cond {:.3e} | asym {:.3e}",
            status,
            self.trace,
            self.min_diagonal,
            self.min_eigenvalue,
            self.condition_number,
            self.max_asymmetry
        )
    }
}

/// Compute conditioning metrics for a covariance matrix.
pub fn assess_covariance<const S: usize>(p: &StateMat<S>) -> CovarianceHealth {
    let finite = p.iter().all(|v| v.is_finite());
    let trace = p.trace();
    let min_diagonal = p.diagonal().min();
    let max_asymmetry = (p - p.transpose()).amax();

    if !finite {
        // Eigen decomposition of NaN input does not terminate reliably
        return CovarianceHealth {
            finite,
            max_asymmetry,
            min_diagonal,
            min_eigenvalue: f64::NAN,
            trace,
            condition_number: f64::INFINITY,
        };
    }

    let symmetric = (p + p.transpose()) * 0.5;
    let eigenvalues = to_dynamic(&symmetric).symmetric_eigenvalues();
    let min_eigenvalue = eigenvalues.min();
    let largest = eigenvalues.amax();
    let smallest = eigenvalues.iter().fold(f64::INFINITY, |acc, v| acc.min(v.abs()));
    let condition_number = if smallest > 0.0 {
        largest / smallest
    } else {
        f64::INFINITY
    };

    CovarianceHealth {
        finite,
        max_asymmetry,
        min_diagonal,
        min_eigenvalue,
        trace,
        condition_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Matrix2;

    #[test]
    fn test_well_conditioned_covariance_is_healthy() {
        let health = assess_covariance(&Matrix2::new(2.0, 0.5, 0.5, 1.0));
        assert!(health.is_healthy());
        assert_relative_eq!(health.trace, 3.0);
        assert_eq!(health.max_asymmetry, 0.0);
        assert!(health.format_status().contains('✓'));
    }

    #[test]
    fn test_diagonal_condition_number() {
        let health = assess_covariance(&Matrix2::new(100.0, 0.0, 0.0, 0.01));
        assert_relative_eq!(health.condition_number, 1e4, max_relative = 1e-9);
        assert_relative_eq!(health.min_eigenvalue, 0.01, max_relative = 1e-9);
    }

    #[test]
    fn test_zero_covariance_is_flagged() {
        let health = assess_covariance(&Matrix2::<f64>::zeros());
        assert!(health.condition_number.is_infinite());
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_indefinite_covariance_is_flagged() {
        let health = assess_covariance(&Matrix2::new(1.0, 2.0, 2.0, 1.0));
        assert!(health.min_eigenvalue < 0.0);
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_asymmetry_is_flagged() {
        let health = assess_covariance(&Matrix2::new(1.0, 0.2, 0.0, 1.0));
        assert_relative_eq!(health.max_asymmetry, 0.2);
        assert!(!health.is_healthy());
    }

    #[test]
    fn test_nan_covariance() {
        let health = assess_covariance(&Matrix2::new(f64::NAN, 0.0, 0.0, 1.0));
        assert!(!health.finite);
        assert!(!health.is_healthy());
        assert!(health.format_status().contains("non-finite"));
    }
}
