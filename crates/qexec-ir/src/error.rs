//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit not found in circuit.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Qubit index does not fit the circuit's addressing range.
    #[error("Qubit index {0} is out of range")]
    QubitOutOfRange(usize),

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),

    /// Operation requires different number of qubits.
    #[error("Operation '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the operation.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Matrix operand has the wrong shape.
    #[error("Invalid matrix for '{gate_name}': {reason}")]
    InvalidMatrix {
        /// Name of the operation.
        gate_name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Noise channel parameter outside `[0, 1]`.
    #[error("Noise parameter {value} for '{channel}' must lie in [0, 1]")]
    InvalidNoiseParameter {
        /// Channel name.
        channel: String,
        /// Offending value.
        value: f64,
    },

    /// Observable name outside the supported set.
    #[error("Unknown observable '{0}'")]
    UnknownObservable(String),

    /// Parameter is unbound.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },
}

#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
