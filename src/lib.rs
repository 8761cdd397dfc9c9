//! Unscented Kalman filter for nonlinear continuous-time systems.
//!
//! [`UnscentedKalmanFilter`] owns the estimate, its covariance and the
//! sigma points cached between a predict and the corrections that follow
//! it. The numerical pieces it leans on (sigma point generation, the
//! unscented transform, finite-difference Jacobians, RK4 integration and
//! noise discretization) live in [`unscented`] and [`system`].

pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod replay;
pub mod system;
pub mod types;
pub mod unscented;

pub use config::{SigmaPointConfig, UkfConfig};
pub use error::{EstimatorError, Result};
pub use filters::{UkfSnapshot, UnscentedKalmanFilter};
pub use unscented::{MerweScaledSigmaPoints, SigmaPointGenerator};
