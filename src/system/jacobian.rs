use nalgebra::{SMatrix, SVector};

use crate::types::{InputVec, StateMat, StateVec};

/// Perturbation used for the central differences below.
const EPSILON: f64 = 1e-5;

/// Approximate the Jacobian of `f: R^C -> R^R` at `x` with central differences.
///
/// Requires `2C` evaluations of `f`. Central differences cost twice as much as
/// forward differences but drop the first-order truncation error.
pub fn numerical_jacobian<const R: usize, const C: usize>(
    mut f: impl FnMut(&SVector<f64, C>) -> SVector<f64, R>,
    x: &SVector<f64, C>,
) -> SMatrix<f64, R, C> {
    let mut jac = SMatrix::<f64, R, C>::zeros();

    for j in 0..C {
        let mut x_plus = *x;
        x_plus[j] += EPSILON;
        let mut x_minus = *x;
        x_minus[j] -= EPSILON;

        let column = (f(&x_plus) - f(&x_minus)) / (2.0 * EPSILON);
        jac.set_column(j, &column);
    }

    jac
}

/// Jacobian of `f(x, u)` with respect to the state, holding `u` fixed.
pub fn numerical_jacobian_x<const S: usize, const I: usize>(
    f: impl Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S>,
    x: &StateVec<S>,
    u: &InputVec<I>,
) -> StateMat<S> {
    numerical_jacobian(|x| f(x, u), x)
}

/// Jacobian of `f(x, u)` with respect to the input, holding `x` fixed.
pub fn numerical_jacobian_u<const S: usize, const I: usize>(
    f: impl Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S>,
    x: &StateVec<S>,
    u: &InputVec<I>,
) -> SMatrix<f64, S, I> {
    numerical_jacobian(|u| f(x, u), u)
}
