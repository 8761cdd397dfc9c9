use crate::types::{InputVec, StateVec};

/// Single step of the classic 4th-order Runge-Kutta method.
///
/// Advances `x` by `dt` seconds through `dx/dt = f(x, u)` with the input
/// held constant over the step.
pub fn runge_kutta<const S: usize, const I: usize>(
    f: impl Fn(&StateVec<S>, &InputVec<I>) -> StateVec<S>,
    x: &StateVec<S>,
    u: &InputVec<I>,
    dt: f64,
) -> StateVec<S> {
    let half_dt = 0.5 * dt;

    let k1 = f(x, u);
    let k2 = f(&(x + k1 * half_dt), u);
    let k3 = f(&(x + k2 * half_dt), u);
    let k4 = f(&(x + k3 * dt), u);

    x + (k1 + k2 * 2.0 + k3 * 2.0 + k4) * (dt / 6.0)
}

/// RK4 step for models without an input.
pub fn runge_kutta_autonomous<const S: usize>(
    f: impl Fn(&StateVec<S>) -> StateVec<S>,
    x: &StateVec<S>,
    dt: f64,
) -> StateVec<S> {
    runge_kutta(|x, _u: &InputVec<0>| f(x), x, &InputVec::<0>::zeros(), dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Vector1, Vector2};

    #[test]
    fn test_exponential_decay() {
        let x = Vector1::new(1.0);
        let x1 = runge_kutta_autonomous(|x| -x, &x, 0.01);
        assert_abs_diff_eq!(x1[0], (-0.01_f64).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_constant_acceleration_is_exact() {
        // [position, velocity] under u = 1 m/s²
        let f = |x: &Vector2<f64>, u: &Vector1<f64>| Vector2::new(x[1], u[0]);
        let x = runge_kutta(f, &Vector2::new(0.0, 0.0), &Vector1::new(1.0), 0.02);

        assert_abs_diff_eq!(x[0], 0.0002, epsilon = 1e-15);
        assert_abs_diff_eq!(x[1], 0.02, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_dynamics_is_identity() {
        let f = |_x: &Vector2<f64>, _u: &Vector1<f64>| Vector2::zeros();
        let x0 = Vector2::new(3.0, -7.0);
        assert_eq!(runge_kutta(f, &x0, &Vector1::new(5.0), 0.5), x0);
    }
}
