pub mod health;
pub mod ukf;

pub use health::{assess_covariance, CovarianceHealth};
pub use ukf::{UkfSnapshot, UnscentedKalmanFilter};
