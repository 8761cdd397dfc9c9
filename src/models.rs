//! Reference nonlinear models
//!
//! Each model bundles its continuous dynamics, its primary measurement and
//! a default configuration, plus any auxiliary sensors it can fuse through
//! [`UnscentedKalmanFilter::correct_with`].

use nalgebra::{Matrix1, Vector1, Vector2, Vector3};
use std::f64::consts::PI;

use crate::config::UkfConfig;
use crate::error::{EstimatorError, Result};
use crate::filters::UnscentedKalmanFilter;
use crate::types::{InputVec, OutputVec, StateVec};

/// A dynamical system the filter can track.
pub trait Model<const S: usize, const I: usize, const O: usize>: 'static {
    /// Name used in logs and replay reports
    const NAME: &'static str;

    /// Continuous dynamics dx/dt = f(x, u)
    fn dynamics(x: &StateVec<S>, u: &InputVec<I>) -> StateVec<S>;

    /// Primary measurement y = h(x, u)
    fn measurement(x: &StateVec<S>, u: &InputVec<I>) -> OutputVec<O>;

    fn default_config() -> UkfConfig;

    /// Build a filter for this model.
    fn build_filter(config: &UkfConfig) -> Result<UnscentedKalmanFilter<S, I, O>> {
        UnscentedKalmanFilter::from_config(Self::dynamics, Self::measurement, config)
    }

    /// Fuse a scalar reading from an auxiliary sensor.
    fn correct_extra(
        _filter: &mut UnscentedKalmanFilter<S, I, O>,
        _u: &InputVec<I>,
        sensor: &str,
        _value: f64,
        _std_dev: f64,
    ) -> Result<()> {
        Err(EstimatorError::UnknownSensor(sensor.to_string()))
    }
}

/// Scalar variance as a 1x1 noise matrix
fn scalar_noise(std_dev: f64) -> Matrix1<f64> {
    Matrix1::new(std_dev * std_dev)
}

/// Wrap an angle to [-pi, pi)
pub fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Point mass on a line: state [position, velocity], input acceleration,
/// position fix.
///
/// Auxiliary sensor: `velocity`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DoubleIntegrator;

impl Model<2, 1, 1> for DoubleIntegrator {
    const NAME: &'static str = "double_integrator";

    fn dynamics(x: &Vector2<f64>, u: &Vector1<f64>) -> Vector2<f64> {
        Vector2::new(x[1], u[0])
    }

    fn measurement(x: &Vector2<f64>, _u: &Vector1<f64>) -> Vector1<f64> {
        Vector1::new(x[0])
    }

    fn default_config() -> UkfConfig {
        UkfConfig::new(&[0.01, 0.1], &[0.05], 0.02)
    }

    fn correct_extra(
        filter: &mut UnscentedKalmanFilter<2, 1, 1>,
        u: &Vector1<f64>,
        sensor: &str,
        value: f64,
        std_dev: f64,
    ) -> Result<()> {
        match sensor {
            "velocity" => {
                filter.correct_with::<1>(
                    u,
                    &Vector1::new(value),
                    |x: &Vector2<f64>, _u: &Vector1<f64>| Vector1::new(x[1]),
                    &scalar_noise(std_dev),
                );
                Ok(())
            }
            _ => Err(EstimatorError::UnknownSensor(sensor.to_string())),
        }
    }
}

/// Damped pendulum: state [angle, angular rate], input torque per unit
/// inertia, angle measurement.
///
/// Auxiliary sensor: `rate` (gyro).
#[derive(Clone, Copy, Debug, Default)]
pub struct Pendulum;

impl Pendulum {
    pub const GRAVITY: f64 = 9.81;
    /// Rod length [m]
    pub const LENGTH: f64 = 1.0;
    /// Viscous damping [1/s]
    pub const DAMPING: f64 = 0.5;
}

impl Model<2, 1, 1> for Pendulum {
    const NAME: &'static str = "pendulum";

    fn dynamics(x: &Vector2<f64>, u: &Vector1<f64>) -> Vector2<f64> {
        let theta_ddot =
            -(Self::GRAVITY / Self::LENGTH) * x[0].sin() - Self::DAMPING * x[1] + u[0];
        Vector2::new(x[1], theta_ddot)
    }

    fn measurement(x: &Vector2<f64>, _u: &Vector1<f64>) -> Vector1<f64> {
        Vector1::new(x[0])
    }

    fn default_config() -> UkfConfig {
        UkfConfig::new(&[0.001, 0.05], &[0.01], 0.01)
    }

    fn correct_extra(
        filter: &mut UnscentedKalmanFilter<2, 1, 1>,
        u: &Vector1<f64>,
        sensor: &str,
        value: f64,
        std_dev: f64,
    ) -> Result<()> {
        match sensor {
            "rate" => {
                filter.correct_with::<1>(
                    u,
                    &Vector1::new(value),
                    |x: &Vector2<f64>, _u: &Vector1<f64>| Vector1::new(x[1]),
                    &scalar_noise(std_dev),
                );
                Ok(())
            }
            _ => Err(EstimatorError::UnknownSensor(sensor.to_string())),
        }
    }
}

/// Planar unicycle: state [x, y, heading], input [speed, turn rate],
/// position fix.
///
/// Auxiliary sensor: `heading` (compass), fused through a one-row model.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unicycle;

impl Model<3, 2, 2> for Unicycle {
    const NAME: &'static str = "unicycle";

    fn dynamics(x: &Vector3<f64>, u: &Vector2<f64>) -> Vector3<f64> {
        let (sin_h, cos_h) = x[2].sin_cos();
        Vector3::new(u[0] * cos_h, u[0] * sin_h, u[1])
    }

    fn measurement(x: &Vector3<f64>, _u: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(x[0], x[1])
    }

    fn default_config() -> UkfConfig {
        UkfConfig::new(&[0.05, 0.05, 0.01], &[0.5, 0.5], 0.05)
    }

    fn correct_extra(
        filter: &mut UnscentedKalmanFilter<3, 2, 2>,
        u: &Vector2<f64>,
        sensor: &str,
        value: f64,
        std_dev: f64,
    ) -> Result<()> {
        match sensor {
            "heading" => {
                // Unwrap the reading next to the estimate so the residual is short
                let estimate = filter.xhat_element(2);
                let unwrapped = estimate + wrap_angle(value - estimate);
                filter.correct_with::<1>(
                    u,
                    &Vector1::new(unwrapped),
                    |x: &Vector3<f64>, _u: &Vector2<f64>| Vector1::new(x[2]),
                    &scalar_noise(std_dev),
                );
                Ok(())
            }
            _ => Err(EstimatorError::UnknownSensor(sensor.to_string())),
        }
    }
}
