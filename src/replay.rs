//! Offline replay of recorded sample logs through a filter
//!
//! A log is a JSON document (optionally gzip-compressed) holding timestamped
//! samples. The gap between consecutive timestamps drives `predict`, the
//! primary measurement drives `correct`, and auxiliary readings go through
//! the model's own sensor handlers.

use flate2::read::GzDecoder;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::UkfConfig;
use crate::error::{EstimatorError, Result};
use crate::filters::UkfSnapshot;
use crate::models::Model;
use crate::system::make_cov_matrix;
use crate::types::{InputVec, OutputVec, StateVec};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtraMeasurement {
    pub sensor: String,
    pub value: f64,
    pub std_dev: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds, monotonically increasing
    pub timestamp: f64,
    #[serde(default)]
    pub input: Vec<f64>,
    #[serde(default)]
    pub measurement: Option<Vec<f64>>,
    #[serde(default)]
    pub extra: Vec<ExtraMeasurement>,
    /// Ground truth state, when the log was simulated
    #[serde(default)]
    pub truth: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Initial estimate (zero when absent)
    #[serde(default)]
    pub initial_state: Option<Vec<f64>>,
    /// Initial per-state std-devs (zero covariance when absent)
    #[serde(default)]
    pub initial_std_devs: Option<Vec<f64>>,
    pub samples: Vec<Sample>,
}

/// Filter output after one sample
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub timestamp: f64,
    pub x_hat: Vec<f64>,
    pub covariance_trace: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayReport {
    pub model: String,
    pub samples: usize,
    pub predictions: u64,
    pub corrections: u64,
    pub extra_corrections: u64,
    /// Samples dropped for a non-positive time gap
    pub skipped_samples: u64,
    pub unknown_sensor_readings: u64,
    /// Per-state RMSE against truth, when the log carries it
    pub rmse: Option<Vec<f64>>,
    pub final_estimate: UkfSnapshot,
    pub estimates: Vec<EstimateRecord>,
}

pub fn load_log(path: &Path) -> Result<ReplayLog> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let reader = BufReader::new(GzDecoder::new(file));
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn to_vector<const N: usize>(field: &'static str, values: &[f64]) -> Result<SVector<f64, N>> {
    if values.len() != N {
        return Err(EstimatorError::DimensionMismatch {
            field,
            expected: N,
            actual: values.len(),
        });
    }
    Ok(SVector::<f64, N>::from_column_slice(values))
}

/// Run the whole log through a fresh filter for model `M`.
pub fn replay<M, const S: usize, const I: usize, const O: usize>(
    log: &ReplayLog,
    config: &UkfConfig,
) -> Result<ReplayReport>
where
    M: Model<S, I, O>,
{
    let mut filter = M::build_filter(config)?;

    if let Some(x0) = log.initial_state.as_ref() {
        filter.set_xhat(to_vector::<S>("initial_state", x0)?);
    }
    if let Some(std_devs) = log.initial_std_devs.as_ref() {
        let std_devs: [f64; S] = to_vector::<S>("initial_std_devs", std_devs)?.into();
        filter.set_p(make_cov_matrix(&std_devs));
    }

    let mut report = ReplayReport {
        model: M::NAME.to_string(),
        samples: log.samples.len(),
        predictions: 0,
        corrections: 0,
        extra_corrections: 0,
        skipped_samples: 0,
        unknown_sensor_readings: 0,
        rmse: None,
        final_estimate: filter.snapshot(),
        estimates: Vec::with_capacity(log.samples.len()),
    };

    let mut squared_error = StateVec::<S>::zeros();
    let mut truth_count = 0usize;
    let mut last_timestamp: Option<f64> = None;

    for sample in &log.samples {
        let u: InputVec<I> = to_vector::<I>("input", &sample.input)?;

        // 1. Time update from the gap since the last accepted sample
        if let Some(last) = last_timestamp {
            let dt = sample.timestamp - last;
            if dt <= 0.0 {
                log::warn!(
                    "[REPLAY] non-positive gap {:.4}s at t={:.3}, skipping sample",
                    dt,
                    sample.timestamp
                );
                report.skipped_samples += 1;
                continue;
            }
            filter.predict(&u, dt);
            report.predictions += 1;
        }
        last_timestamp = Some(sample.timestamp);

        // 2. Primary measurement
        if let Some(y) = sample.measurement.as_ref() {
            let y: OutputVec<O> = to_vector::<O>("measurement", y)?;
            filter.correct(&u, &y);
            report.corrections += 1;
        }

        // 3. Auxiliary sensors
        for extra in &sample.extra {
            match M::correct_extra(&mut filter, &u, &extra.sensor, extra.value, extra.std_dev) {
                Ok(()) => report.extra_corrections += 1,
                Err(EstimatorError::UnknownSensor(name)) => {
                    log::warn!("[REPLAY] {} has no sensor '{}', reading ignored", M::NAME, name);
                    report.unknown_sensor_readings += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(truth) = sample.truth.as_ref() {
            let truth = to_vector::<S>("truth", truth)?;
            let error = filter.xhat() - truth;
            squared_error += error.component_mul(&error);
            truth_count += 1;
        }

        report.estimates.push(EstimateRecord {
            timestamp: sample.timestamp,
            x_hat: filter.xhat().iter().copied().collect(),
            covariance_trace: filter.p().trace(),
        });
    }

    if truth_count > 0 {
        let mse = squared_error / truth_count as f64;
        report.rmse = Some(mse.iter().map(|v| v.sqrt()).collect());
    }
    report.final_estimate = filter.snapshot();

    log::info!(
        "[REPLAY] {}: {} samples, {} predictions, {} corrections, {} extra, {} skipped",
        report.model,
        report.samples,
        report.predictions,
        report.corrections,
        report.extra_corrections,
        report.skipped_samples
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DoubleIntegrator, Unicycle};
    use crate::system::runge_kutta;
    use nalgebra::{Vector1, Vector2};

    /// Constant acceleration run with a small deterministic wobble on the
    /// position fixes
    fn simulated_log(steps: usize, dt: f64) -> ReplayLog {
        let mut truth = Vector2::new(0.0, 1.0);
        let mut samples = Vec::with_capacity(steps);
        for k in 0..steps {
            let u = Vector1::new(0.2);
            if k > 0 {
                truth = runge_kutta(DoubleIntegrator::dynamics, &truth, &u, dt);
            }
            let wobble = 0.02 * ((k as f64) * 1.7).sin();
            samples.push(Sample {
                timestamp: k as f64 * dt,
                input: vec![u[0]],
                measurement: Some(vec![truth[0] + wobble]),
                extra: Vec::new(),
                truth: Some(vec![truth[0], truth[1]]),
            });
        }
        ReplayLog {
            initial_state: Some(vec![0.0, 0.0]),
            initial_std_devs: Some(vec![1.0, 2.0]),
            samples,
        }
    }

    #[test]
    fn test_replay_tracks_double_integrator() {
        let log = simulated_log(200, 0.02);
        let report =
            replay::<DoubleIntegrator, 2, 1, 1>(&log, &DoubleIntegrator::default_config()).unwrap();

        assert_eq!(report.samples, 200);
        assert_eq!(report.predictions, 199);
        assert_eq!(report.corrections, 200);
        assert_eq!(report.estimates.len(), 200);

        let rmse = report.rmse.unwrap();
        assert!(rmse[0] < 0.1, "position rmse {}", rmse[0]);
        assert!(report.final_estimate.x_hat[1] > 0.5);
    }

    #[test]
    fn test_non_positive_gap_is_skipped() {
        let mut log = simulated_log(5, 0.1);
        log.samples[3].timestamp = log.samples[2].timestamp;

        let report =
            replay::<DoubleIntegrator, 2, 1, 1>(&log, &DoubleIntegrator::default_config()).unwrap();
        assert_eq!(report.skipped_samples, 1);
        assert_eq!(report.predictions, 3);
        assert_eq!(report.estimates.len(), 4);
    }

    #[test]
    fn test_unknown_extra_sensor_is_counted() {
        let mut log = simulated_log(3, 0.1);
        log.samples[1].extra.push(ExtraMeasurement {
            sensor: "velocity".to_string(),
            value: 1.0,
            std_dev: 0.1,
        });
        log.samples[2].extra.push(ExtraMeasurement {
            sensor: "barometer".to_string(),
            value: 1013.0,
            std_dev: 1.0,
        });

        let report =
            replay::<DoubleIntegrator, 2, 1, 1>(&log, &DoubleIntegrator::default_config()).unwrap();
        assert_eq!(report.extra_corrections, 1);
        assert_eq!(report.unknown_sensor_readings, 1);
    }

    #[test]
    fn test_wrong_input_length_is_an_error() {
        let log = ReplayLog {
            initial_state: None,
            initial_std_devs: None,
            samples: vec![Sample {
                timestamp: 0.0,
                input: vec![1.0],
                measurement: None,
                extra: Vec::new(),
                truth: None,
            }],
        };
        let result = replay::<Unicycle, 3, 2, 2>(&log, &Unicycle::default_config());
        assert!(matches!(
            result,
            Err(EstimatorError::DimensionMismatch { field: "input", expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_parses_minimal_log() {
        let json = r#"{
            "samples": [
                { "timestamp": 0.0, "input": [0.0, 0.0], "measurement": [1.0, 2.0] },
                { "timestamp": 0.1, "input": [1.0, 0.0],
                  "extra": [ { "sensor": "heading", "value": 0.0, "std_dev": 0.05 } ] }
            ]
        }"#;
        let log: ReplayLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.samples.len(), 2);
        assert!(log.samples[1].measurement.is_none());

        let report = replay::<Unicycle, 3, 2, 2>(&log, &Unicycle::default_config()).unwrap();
        assert_eq!(report.predictions, 1);
        assert_eq!(report.corrections, 1);
        assert_eq!(report.extra_corrections, 1);
        assert!(report.rmse.is_none());
    }

    #[test]
    fn test_load_gzipped_log() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let log = simulated_log(4, 0.1);
        let path = std::env::temp_dir().join(format!("replay_{}.json.gz", std::process::id()));
        {
            let file = File::create(&path).unwrap();
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder
                .write_all(serde_json::to_string(&log).unwrap().as_bytes())
                .unwrap();
            encoder.finish().unwrap();
        }

        let loaded = load_log(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.samples.len(), 4);
        assert_eq!(loaded.samples[3].input, vec![0.2]);
    }
}
