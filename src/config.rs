use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{EstimatorError, Result};
use crate::unscented::MerweScaledSigmaPoints;

/// Sigma point spread parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigmaPointConfig {
    pub alpha: f64,
    pub beta: f64,
    /// Secondary scaling, `3 - S` when absent
    #[serde(default)]
    pub kappa: Option<f64>,
}

impl SigmaPointConfig {
    pub fn build<const S: usize>(&self) -> MerweScaledSigmaPoints<S> {
        let kappa = self.kappa.unwrap_or(3.0 - S as f64);
        MerweScaledSigmaPoints::new(self.alpha, self.beta, kappa)
    }
}

impl Default for SigmaPointConfig {
    fn default() -> Self {
        Self {
            alpha: 1e-3,
            beta: 2.0,
            kappa: None,
        }
    }
}

/// Filter configuration as stored on disk.
///
/// Values are not validated beyond their lengths: negative standard
/// deviations or a non-positive timestep are passed through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UkfConfig {
    /// Per-state process noise std-devs
    pub state_std_devs: Vec<f64>,
    /// Per-channel measurement noise std-devs
    pub measurement_std_devs: Vec<f64>,
    /// Nominal timestep [seconds]
    pub nominal_dt: f64,
    #[serde(default)]
    pub sigma_points: SigmaPointConfig,
    /// Log a warning whenever P looks degenerate
    #[serde(default)]
    pub conditioning_check: bool,
}

impl UkfConfig {
    pub fn new(state_std_devs: &[f64], measurement_std_devs: &[f64], nominal_dt: f64) -> Self {
        Self {
            state_std_devs: state_std_devs.to_vec(),
            measurement_std_devs: measurement_std_devs.to_vec(),
            nominal_dt,
            sigma_points: SigmaPointConfig::default(),
            conditioning_check: false,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn state_std_array<const S: usize>(&self) -> Result<[f64; S]> {
        to_array("state_std_devs", &self.state_std_devs)
    }

    pub fn measurement_std_array<const O: usize>(&self) -> Result<[f64; O]> {
        to_array("measurement_std_devs", &self.measurement_std_devs)
    }
}

fn to_array<const N: usize>(field: &'static str, values: &[f64]) -> Result<[f64; N]> {
    <[f64; N]>::try_from(values).map_err(|_| EstimatorError::DimensionMismatch {
        field,
        expected: N,
        actual: values.len(),
    })
}
