//! Quantum gate types.
//!
//! Gate names follow the JAQCD instruction vocabulary so that a gate's
//! [`StandardGate::name`] is also its wire `type`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::parameter::ParameterExpression;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit gates
    /// Identity gate.
    I,
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Si,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Ti,
    /// sqrt(X) gate.
    V,
    /// sqrt(X)-dagger gate.
    Vi,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase shift on |1⟩.
    PhaseShift(ParameterExpression),

    // Controlled gates (control first)
    /// Controlled-X (CNOT) gate.
    CNot,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled phase shift on |11⟩.
    CPhaseShift(ParameterExpression),
    /// Controlled phase shift on |00⟩.
    CPhaseShift00(ParameterExpression),
    /// Controlled phase shift on |01⟩.
    CPhaseShift01(ParameterExpression),
    /// Controlled phase shift on |10⟩.
    CPhaseShift10(ParameterExpression),

    // Two-target gates
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Echoed cross-resonance gate.
    Ecr,
    /// Parametrized SWAP.
    PSwap(ParameterExpression),
    /// XY interaction.
    XY(ParameterExpression),
    /// Ising XX coupling.
    XX(ParameterExpression),
    /// Ising YY coupling.
    YY(ParameterExpression),
    /// Ising ZZ coupling.
    ZZ(ParameterExpression),

    // Three-qubit gates
    /// Toffoli gate, two controls and one target.
    CCNot,
    /// Fredkin gate, one control and two targets.
    CSwap,

    /// Arbitrary unitary given as a row-major `2^n × 2^n` matrix.
    Unitary {
        /// Number of target qubits.
        num_qubits: u32,
        /// Row-major matrix entries.
        matrix: Vec<Complex64>,
    },
}

impl StandardGate {
    /// Every gate name this module can represent.
    pub const NAMES: &'static [&'static str] = &[
        "i",
        "h",
        "x",
        "y",
        "z",
        "s",
        "si",
        "t",
        "ti",
        "v",
        "vi",
        "rx",
        "ry",
        "rz",
        "phaseshift",
        "cnot",
        "cy",
        "cz",
        "cphaseshift",
        "cphaseshift00",
        "cphaseshift01",
        "cphaseshift10",
        "swap",
        "iswap",
        "ecr",
        "pswap",
        "xy",
        "xx",
        "yy",
        "zz",
        "ccnot",
        "cswap",
        "unitary",
    ];

    /// Build an arbitrary unitary from matrix rows.
    ///
    /// The rows must form a square matrix whose dimension is a power of two.
    pub fn unitary(rows: Vec<Vec<Complex64>>) -> IrResult<Self> {
        let (num_qubits, matrix) = flatten_operator("unitary", rows)?;
        Ok(StandardGate::Unitary { num_qubits, matrix })
    }

    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "i",
            StandardGate::H => "h",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::S => "s",
            StandardGate::Si => "si",
            StandardGate::T => "t",
            StandardGate::Ti => "ti",
            StandardGate::V => "v",
            StandardGate::Vi => "vi",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::PhaseShift(_) => "phaseshift",
            StandardGate::CNot => "cnot",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CPhaseShift(_) => "cphaseshift",
            StandardGate::CPhaseShift00(_) => "cphaseshift00",
            StandardGate::CPhaseShift01(_) => "cphaseshift01",
            StandardGate::CPhaseShift10(_) => "cphaseshift10",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::Ecr => "ecr",
            StandardGate::PSwap(_) => "pswap",
            StandardGate::XY(_) => "xy",
            StandardGate::XX(_) => "xx",
            StandardGate::YY(_) => "yy",
            StandardGate::ZZ(_) => "zz",
            StandardGate::CCNot => "ccnot",
            StandardGate::CSwap => "cswap",
            StandardGate::Unitary { .. } => "unitary",
        }
    }

    /// Get the number of qubits this gate operates on, controls included.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::H
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::S
            | StandardGate::Si
            | StandardGate::T
            | StandardGate::Ti
            | StandardGate::V
            | StandardGate::Vi
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::PhaseShift(_) => 1,

            StandardGate::CNot
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CPhaseShift(_)
            | StandardGate::CPhaseShift00(_)
            | StandardGate::CPhaseShift01(_)
            | StandardGate::CPhaseShift10(_)
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::Ecr
            | StandardGate::PSwap(_)
            | StandardGate::XY(_)
            | StandardGate::XX(_)
            | StandardGate::YY(_)
            | StandardGate::ZZ(_) => 2,

            StandardGate::CCNot | StandardGate::CSwap => 3,

            StandardGate::Unitary { num_qubits, .. } => *num_qubits,
        }
    }

    /// Number of leading qubit operands that act as controls.
    #[inline]
    pub fn num_controls(&self) -> u32 {
        match self {
            StandardGate::CNot
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CPhaseShift(_)
            | StandardGate::CPhaseShift00(_)
            | StandardGate::CPhaseShift01(_)
            | StandardGate::CPhaseShift10(_)
            | StandardGate::CSwap => 1,
            StandardGate::CCNot => 2,
            _ => 0,
        }
    }

    /// The rotation or phase angle, for gates that take one.
    pub fn angle(&self) -> Option<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::PhaseShift(p)
            | StandardGate::CPhaseShift(p)
            | StandardGate::CPhaseShift00(p)
            | StandardGate::CPhaseShift01(p)
            | StandardGate::CPhaseShift10(p)
            | StandardGate::PSwap(p)
            | StandardGate::XY(p)
            | StandardGate::XX(p)
            | StandardGate::YY(p)
            | StandardGate::ZZ(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable access to the angle, used when binding parameters.
    pub fn angle_mut(&mut self) -> Option<&mut ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::PhaseShift(p)
            | StandardGate::CPhaseShift(p)
            | StandardGate::CPhaseShift00(p)
            | StandardGate::CPhaseShift01(p)
            | StandardGate::CPhaseShift10(p)
            | StandardGate::PSwap(p)
            | StandardGate::XY(p)
            | StandardGate::XX(p)
            | StandardGate::YY(p)
            | StandardGate::ZZ(p) => Some(p),
            _ => None,
        }
    }

    /// Check if this gate still has a free parameter.
    pub fn is_parameterized(&self) -> bool {
        self.angle().is_some_and(ParameterExpression::is_symbolic)
    }

    /// The matrix rows of a [`StandardGate::Unitary`].
    pub fn matrix_rows(&self) -> Option<Vec<Vec<Complex64>>> {
        match self {
            StandardGate::Unitary { num_qubits, matrix } => {
                Some(unflatten_operator(*num_qubits, matrix))
            }
            _ => None,
        }
    }
}

/// Flatten square matrix rows into row-major order.
///
/// Returns the number of qubits the operator acts on. Used for unitaries and
/// Kraus operators alike.
pub(crate) fn flatten_operator(
    gate_name: &str,
    rows: Vec<Vec<Complex64>>,
) -> IrResult<(u32, Vec<Complex64>)> {
    let dim = rows.len();
    let invalid = |reason: String| IrError::InvalidMatrix {
        gate_name: gate_name.to_string(),
        reason,
    };

    if dim < 2 || !dim.is_power_of_two() {
        return Err(invalid(format!(
            "dimension {dim} is not a power of two of at least 2"
        )));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dim) {
        return Err(invalid(format!(
            "row {i} has {} entries, expected {dim}",
            row.len()
        )));
    }

    let num_qubits = dim.trailing_zeros();
    Ok((num_qubits, rows.into_iter().flatten().collect()))
}

pub(crate) fn unflatten_operator(num_qubits: u32, matrix: &[Complex64]) -> Vec<Vec<Complex64>> {
    let dim = 1usize << num_qubits;
    matrix.chunks(dim).map(<[Complex64]>::to_vec).collect()
}
