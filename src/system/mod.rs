//! Numerical collaborators of the filter core
//!
//! Each piece is a self-contained primitive: noise model construction,
//! finite-difference linearization, fixed-step integration and
//! continuous-to-discrete noise conversion.

pub mod discretization;
pub mod jacobian;
pub mod noise;
pub mod runge_kutta;

pub use discretization::{
    discretize_a, discretize_aq_exact, discretize_aq_taylor, discretize_r, Discretizer,
    ExactDiscretizer, TaylorDiscretizer,
};
pub use jacobian::{numerical_jacobian, numerical_jacobian_u, numerical_jacobian_x};
pub use noise::make_cov_matrix;
pub use runge_kutta::{runge_kutta, runge_kutta_autonomous};
