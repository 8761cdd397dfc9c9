//! Sigma point generation and the unscented transform.

pub mod merwe;
pub mod transform;

pub use merwe::{MerweScaledSigmaPoints, SigmaPointGenerator};
pub use transform::unscented_transform;
