//! Circuit metrics reported by the transpile endpoint.

use qexec_hal::{Backend, HalError};
use qexec_ir::Circuit;
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Reported in place of a multi-qubit gate depth, which is not computed.
pub const MULTI_QUBIT_GATE_DEPTH: i64 = -1;

/// Size and shape of a decoded circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CircuitMetrics {
    pub depth: usize,
    pub multi_qubit_gate_depth: i64,
    pub width: usize,
    #[serde(rename = "total-number-of-operations")]
    pub total_ops: usize,
    #[serde(rename = "number-of-single-qubit-gates")]
    pub single_qubit_gates: usize,
    #[serde(rename = "number-of-multi-qubit-gates")]
    pub multi_qubit_gates: usize,
    #[serde(rename = "number-of-measurement-operations")]
    pub measurement_ops: usize,
}

/// Compute metrics for `circuit` as it would run on `backend`.
///
/// Depth is whatever the backend computes; a backend without that capability
/// yields [`MetricsError::UnsupportedBackend`].
pub fn metrics(circuit: &Circuit, backend: &dyn Backend) -> Result<CircuitMetrics, MetricsError> {
    let depth = backend.depth(circuit).map_err(|e| match e {
        HalError::Unsupported(_) => MetricsError::UnsupportedBackend {
            backend: backend.name().to_string(),
        },
        other => MetricsError::Backend(other),
    })?;

    let multi_qubit_gates = circuit
        .instructions()
        .iter()
        .filter(|i| i.is_multi_qubit())
        .count();
    let single_qubit_gates = circuit.num_instructions() - multi_qubit_gates;
    let measurement_ops = circuit.result_types().len();

    Ok(CircuitMetrics {
        depth,
        multi_qubit_gate_depth: MULTI_QUBIT_GATE_DEPTH,
        width: circuit.width(),
        total_ops: circuit.num_instructions() + measurement_ops,
        single_qubit_gates,
        multi_qubit_gates,
        measurement_ops,
    })
}
