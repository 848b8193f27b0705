//! Error types for feature transform operations.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Error type for every fallible transform operation.
///
/// Errors surface synchronously at the call that detects them. Nothing in
/// this crate retries; a failed partition is the caller's to reschedule.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Requested output width is not one of the supported float widths.
    #[error("Unsupported dtype: {0} (expected float16 or float32)")]
    UnsupportedDType(String),

    /// Batch column count disagrees with the stored global parameters.
    #[error("Shape mismatch for '{feature}': expected {expected} columns, got {got}")]
    ShapeMismatch {
        feature: String,
        expected: usize,
        got: usize,
    },

    /// Configured bounds leave no room to normalize into.
    #[error("Degenerate range for '{feature}': max_bound {max_bound} <= min_bound {min_bound}")]
    DegenerateRange {
        feature: String,
        max_bound: f64,
        min_bound: f64,
    },

    /// Categorical token absent from the vocabulary.
    #[error("Unknown token '{token}' for feature '{feature}'")]
    UnknownToken { feature: String, token: String },

    /// Input array rank is neither 1 nor 2.
    #[error("Invalid shape: expected a 1-D or 2-D array, got {ndim} dimensions")]
    InvalidShape { ndim: usize },

    /// `apply` called before global parameters were merged or supplied.
    #[error("Transform '{0}' has no global parameters; merge must run first")]
    NotMerged(String),

    /// Numeric merge was handed no partition results.
    #[error("No partial statistics to merge for '{0}'")]
    EmptyPartials(String),

    /// Batch kind does not match what the transform consumes.
    #[error("Unsupported input for '{feature}': expected {expected} values")]
    UnsupportedInput {
        feature: String,
        expected: &'static str,
    },

    /// Partition does not carry a column the pipeline needs.
    #[error("Missing feature column '{0}' in partition")]
    MissingFeature(String),

    /// Construction-time configuration is invalid.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Encoding or decoding of persisted parameters failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for TransformError {
    fn from(err: bincode::Error) -> Self {
        TransformError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        TransformError::Serialization(err.to_string())
    }
}
