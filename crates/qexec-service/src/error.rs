//! Error types for the execution service.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use qexec_jaqcd::{JaqcdError, MetricsError};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for pipeline stages.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Result type for result store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persisted for jobs whose backend could not be resolved or provisioned.
pub const BACKEND_MESSAGE: &str = "qpu-name wrong or error with aws";

/// Persisted for jobs whose circuit could not be obtained.
pub const SOURCE_MESSAGE: &str = "URL not found or Error during restoration of braket circuit.";

/// Persisted for jobs that failed after a circuit and backend were in hand.
pub const EXECUTION_MESSAGE: &str = "execution failed";

/// Why a job ended in the `Failed` stage.
///
/// Every variant is terminal for its job; none is retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// The circuit IR could not be decoded.
    #[error("{0}")]
    MalformedIr(String),

    /// The request asks for something this service does not do.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A circuit download failed.
    #[error("Download of {url} failed: {reason}")]
    DownloadError { url: String, reason: String },

    /// A download was refused for lack of valid credentials.
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// No backend answers to the requested name, or it could not be set up.
    #[error("Backend '{name}' not available: {reason}")]
    BackendNotFound { name: String, reason: String },

    /// The backend rejected the circuit or reported failure or cancellation.
    #[error("Execution aborted: {0}")]
    ExecutionAborted(String),

    /// Input parameters do not bind every free circuit parameter.
    #[error("Parameter binding failed: {0}")]
    BindingError(String),

    /// The task was still running after the last status query.
    #[error("Task still pending after {attempts} status queries")]
    PollTimeout { attempts: u32 },
}

impl PipelineError {
    /// Stable machine-readable kind, persisted as `cause`.
    pub fn cause(&self) -> &'static str {
        match self {
            PipelineError::MalformedIr(_) => "MalformedIR",
            PipelineError::UnsupportedOperation(_) => "UnsupportedOperation",
            PipelineError::DownloadError { .. } => "DownloadError",
            PipelineError::AuthError(_) => "AuthError",
            PipelineError::BackendNotFound { .. } => "BackendNotFound",
            PipelineError::ExecutionAborted(_) => "ExecutionAborted",
            PipelineError::BindingError(_) => "BindingError",
            PipelineError::PollTimeout { .. } => "PollTimeout",
        }
    }

    /// Client-facing message persisted as `error`.
    pub fn message(&self) -> &'static str {
        match self {
            PipelineError::BackendNotFound { .. } => BACKEND_MESSAGE,
            PipelineError::MalformedIr(_)
            | PipelineError::UnsupportedOperation(_)
            | PipelineError::DownloadError { .. }
            | PipelineError::AuthError(_) => SOURCE_MESSAGE,
            PipelineError::ExecutionAborted(_)
            | PipelineError::BindingError(_)
            | PipelineError::PollTimeout { .. } => EXECUTION_MESSAGE,
        }
    }

    /// Terminal result payload for a failed job.
    pub fn payload(&self) -> Value {
        json!({ "error": self.message(), "cause": self.cause() })
    }
}

impl From<JaqcdError> for PipelineError {
    fn from(err: JaqcdError) -> Self {
        PipelineError::MalformedIr(err.to_string())
    }
}

impl From<MetricsError> for PipelineError {
    fn from(err: MetricsError) -> Self {
        PipelineError::UnsupportedOperation(err.to_string())
    }
}

/// Errors raised by a [`ResultStore`](crate::storage::ResultStore).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// No record with this id.
    #[error("Result not found: {0}")]
    NotFound(String),

    /// A record with this id already exists.
    #[error("Result already exists: {0}")]
    Duplicate(String),

    /// The payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage engine failed.
    #[error("Storage error: {0}")]
    Backend(String),
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// The job queue no longer accepts work.
#[derive(Debug, Error)]
#[error("Job queue is shut down")]
pub struct QueueClosed;

/// Errors raised while assembling the service at start-up.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] qexec_hal::HalError),

    #[error("Instruction vocabulary mismatch: {0}")]
    Vocabulary(#[from] JaqcdError),
}

/// Errors returned synchronously by the HTTP API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: status.as_u16(),
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(format!("Result not found: {id}")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QueueClosed> for ApiError {
    fn from(err: QueueClosed) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}
