//! Domain-level error taxonomy for croptrace.
//!
//! Fraud signals are never errors: a failed plausibility check is a
//! [`SignalVerdict`](crate::signals::SignalVerdict). Errors here cover
//! malformed input and unreachable collaborators only.

use std::fmt;

/// Errors produced by boundary validation of claims, photo sets and records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("field {field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("field {field} has invalid value {value}: {reason}")]
    InvalidNumber {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("at least {required} photos are required, got {actual}")]
    TooFewPhotos { required: usize, actual: usize },

    #[error("duplicate photo detected at positions {first} and {second}")]
    DuplicatePhoto { first: usize, second: usize },

    #[error("invalid record field {field}: {reason}")]
    InvalidRecordField { field: &'static str, reason: String },

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("estimated shelf life of {days} days overflows the calendar")]
    ShelfLifeOutOfRange { days: u32 },
}

/// External collaborators whose failures surface as
/// [`CroptraceError::DependencyUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    FeatureVectorProvider,
    ShelfLifeEstimator,
    Ledger,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dependency::FeatureVectorProvider => "feature-vector provider",
            Dependency::ShelfLifeEstimator => "shelf-life estimator",
            Dependency::Ledger => "ledger",
        };
        f.write_str(name)
    }
}

/// croptrace domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CroptraceError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{dependency} unavailable: {message}")]
    DependencyUnavailable {
        dependency: Dependency,
        message: String,
    },

    #[error("record not found on ledger: {0}")]
    RecordNotFound(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CroptraceError {
    pub fn unavailable(dependency: Dependency, message: impl Into<String>) -> Self {
        CroptraceError::DependencyUnavailable {
            dependency,
            message: message.into(),
        }
    }

    /// Whether the orchestration layer may retry the failed operation.
    ///
    /// Only collaborator outages are retryable; a batch is never marked
    /// fraudulent because a dependency was unreachable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CroptraceError::DependencyUnavailable { .. })
    }
}

/// Result type for croptrace domain operations.
pub type Result<T> = std::result::Result<T, CroptraceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::LatitudeOutOfRange(91.5);
        assert!(err.to_string().contains("91.5"));

        let err = ValidationError::TooFewPhotos {
            required: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "at least 2 photos are required, got 1");
    }

    #[test]
    fn test_dependency_unavailable_is_retryable() {
        let err = CroptraceError::unavailable(Dependency::Ledger, "connection refused");
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "ledger unavailable: connection refused");
    }

    #[test]
    fn test_validation_is_not_retryable() {
        let err: CroptraceError = ValidationError::EmptyField { field: "crop_type" }.into();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("crop_type"));
    }

    #[test]
    fn test_digest_mismatch_error() {
        let err = CroptraceError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
