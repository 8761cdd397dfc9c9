use thiserror::Error;

/// State estimator error types
///
/// Only the I/O facing parts of the crate return these. The filter core
/// itself never fails; numerical trouble shows up in the numbers.
#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown sensor: {0}")]
    UnknownSensor(String),
}

/// Result type for configuration and replay operations
pub type Result<T> = std::result::Result<T, EstimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = EstimatorError::DimensionMismatch {
            field: "state_std_devs",
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "state_std_devs: expected 3 values, got 2");
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/here.json")?)
        }
        assert!(matches!(open_missing(), Err(EstimatorError::Io(_))));
    }
}
