pub mod linalg;

pub use linalg::*;

use std::sync::Arc;

/// Continuous-time dynamics `f(x, u) -> dx/dt`.
pub type DynamicsFn<const S: usize, const I: usize> =
    Arc<dyn Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S> + Send + Sync>;

/// Measurement model `h(x, u) -> y` with `O` rows.
pub type MeasurementFn<const S: usize, const I: usize, const O: usize> =
    Arc<dyn Fn(&StateVec<S>, &InputVec<I>) -> OutputVec<O> + Send + Sync>;
