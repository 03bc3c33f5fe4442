use std::path::PathBuf;

use region_ops::RegionError;
use thiserror::Error;

/// The error type for metric operations.
///
/// Every variant signals caller misuse or an I/O failure; a call that returns an error
/// leaves the accumulator it was called on unchanged.
#[derive(Error, Debug)]
pub enum MetricError {
    /// Prediction and target tensors do not have the same shape.
    #[error("Shape mismatch: prediction {prediction}, target {target}")]
    ShapeMismatch {
        /// Shape of the prediction tensor.
        prediction: String,
        /// Shape of the target tensor.
        target: String,
    },

    /// An input tensor cannot be viewed as the requested image plane.
    #[error("Invalid input tensor shape: expected {expected}, got {actual}")]
    InvalidShape {
        /// Description of the expected shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },

    /// A metric configuration is logically inconsistent.
    #[error("Invalid metric configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// A count that is bounded by construction exceeded its bound.
    #[error("Count invariant violated: {name} = {value} exceeds {bound_name} = {bound}")]
    CountInvariant {
        /// Name of the offending count.
        name: &'static str,
        /// Its value.
        value: u64,
        /// Name of the bounding count.
        bound_name: &'static str,
        /// The bound.
        bound: u64,
    },

    /// Tensor data could not be transferred to host memory.
    #[error("Tensor data transfer failed: {reason}")]
    TensorData {
        /// Description of the failure.
        reason: String,
    },

    /// Region extraction rejected the image plane.
    #[error(transparent)]
    Region(#[from] RegionError),

    /// Appending to the missed-image log failed.
    #[error("Failed to append to missed-image log {}", path.display())]
    MissedLog {
        /// The log path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = Result<T, MetricError>;
