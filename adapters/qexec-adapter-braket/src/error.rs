//! Error types for AWS Braket adapter.

use qexec_hal::HalError;
use thiserror::Error;

/// Result type for Braket operations.
pub type BraketResult<T> = Result<T, BraketError>;

/// Errors that can occur when using AWS Braket.
#[derive(Debug, Error)]
pub enum BraketError {
    /// Missing S3 bucket configuration.
    #[error("S3 bucket not configured. Set QEXEC_BRAKET_S3_BUCKET environment variable.")]
    MissingS3Bucket,

    /// Name is neither a device ARN nor a known device.
    #[error("Invalid device ARN: {0}")]
    InvalidDeviceArn(String),

    /// Braket API error.
    #[error("Braket API error: {0}")]
    BraketApi(String),

    /// S3 error.
    #[error("S3 error: {0}")]
    S3Error(String),

    /// Task not found.
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Task failed.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Task was cancelled.
    #[error("Task was cancelled: {0}")]
    TaskCancelled(String),

    /// Task is not finished yet.
    #[error("Task not yet completed: {0}")]
    TaskPending(String),

    /// Circuit conversion error.
    #[error("Circuit conversion error: {0}")]
    CircuitError(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Result parsing error.
    #[error("Failed to parse task result: {0}")]
    ResultParseError(String),
}

impl From<BraketError> for HalError {
    fn from(e: BraketError) -> Self {
        match e {
            BraketError::MissingS3Bucket => HalError::Configuration(e.to_string()),
            BraketError::InvalidDeviceArn(name) => HalError::BackendUnavailable(name),
            BraketError::TaskNotFound(id) => HalError::JobNotFound(id),
            BraketError::TaskFailed(msg) => HalError::JobFailed(msg),
            BraketError::TaskCancelled(_) => HalError::JobCancelled,
            BraketError::CircuitError(msg) => HalError::InvalidCircuit(msg),
            _ => HalError::Backend(e.to_string()),
        }
    }
}
