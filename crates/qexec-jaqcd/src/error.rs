//! Error types for the JAQCD translator.

use qexec_hal::HalError;
use qexec_ir::IrError;
use thiserror::Error;

/// Reasons a JAQCD program cannot be decoded or encoded.
///
/// Every decode failure means the IR is malformed; the variants only say
/// where.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JaqcdError {
    /// Input is not valid JSON for the program schema.
    #[error("Malformed IR: {0}")]
    Json(#[from] serde_json::Error),

    /// Instruction type outside the supported vocabulary.
    #[error("Malformed IR: unknown instruction type '{kind}' at index {index}")]
    UnknownInstruction { index: usize, kind: String },

    /// Result type outside the supported vocabulary.
    #[error("Malformed IR: unknown result type '{kind}' at index {index}")]
    UnknownResultType { index: usize, kind: String },

    /// Operand fields do not fit the instruction or result type.
    #[error("Malformed IR: {kind} at index {index}: {reason}")]
    InvalidOperands {
        index: usize,
        kind: String,
        reason: String,
    },

    /// The circuit model rejected the decoded instruction.
    #[error("Malformed IR: {kind} at index {index}: {source}")]
    Circuit {
        index: usize,
        kind: String,
        #[source]
        source: IrError,
    },

    /// Backend vocabulary lacks instruction types the translator produces.
    #[error("Backend does not support instruction types: {}", .0.join(", "))]
    UnsupportedVocabulary(Vec<String>),
}

/// Reasons circuit metrics cannot be computed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetricsError {
    /// The backend cannot compute circuit depth.
    #[error("Backend '{backend}' does not support depth computation")]
    UnsupportedBackend { backend: String },

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] HalError),
}

/// Result type for translator operations.
pub type JaqcdResult<T> = Result<T, JaqcdError>;
