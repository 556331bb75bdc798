//! Result types a circuit declares alongside its instructions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IrError;
use crate::qubit::QubitId;

/// Single-qubit observables usable in measurement result types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Observable {
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// Hadamard.
    H,
    /// Identity.
    I,
}

impl Observable {
    /// Lower-case wire name.
    pub fn name(self) -> &'static str {
        match self {
            Observable::X => "x",
            Observable::Y => "y",
            Observable::Z => "z",
            Observable::H => "h",
            Observable::I => "i",
        }
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Observable {
    type Err = IrError;

    /// Names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Observable::X),
            "y" => Ok(Observable::Y),
            "z" => Ok(Observable::Z),
            "h" => Ok(Observable::H),
            "i" => Ok(Observable::I),
            _ => Err(IrError::UnknownObservable(s.to_string())),
        }
    }
}

/// A declared result of running a circuit.
///
/// `targets` of `None` means the whole register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultType {
    /// The full state vector.
    StateVector,
    /// The (reduced) density matrix.
    DensityMatrix {
        /// Qubits to keep.
        targets: Option<Vec<QubitId>>,
    },
    /// Computational-basis probabilities.
    Probability {
        /// Qubits to marginalize onto.
        targets: Option<Vec<QubitId>>,
    },
    /// Amplitudes of selected basis states.
    Amplitude {
        /// Bitstrings to report.
        states: Vec<String>,
    },
    /// Expectation value of an observable.
    Expectation {
        /// Tensor-product factors of the observable.
        observable: Vec<Observable>,
        /// Qubits the observable acts on.
        targets: Option<Vec<QubitId>>,
    },
    /// Measurement samples of an observable.
    Sample {
        /// Tensor-product factors of the observable.
        observable: Vec<Observable>,
        /// Qubits the observable acts on.
        targets: Option<Vec<QubitId>>,
    },
    /// Variance of an observable.
    Variance {
        /// Tensor-product factors of the observable.
        observable: Vec<Observable>,
        /// Qubits the observable acts on.
        targets: Option<Vec<QubitId>>,
    },
}

impl ResultType {
    /// Every result type name.
    pub const NAMES: &'static [&'static str] = &[
        "statevector",
        "densitymatrix",
        "probability",
        "amplitude",
        "expectation",
        "sample",
        "variance",
    ];

    /// Wire name of this result type.
    pub fn name(&self) -> &'static str {
        match self {
            ResultType::StateVector => "statevector",
            ResultType::DensityMatrix { .. } => "densitymatrix",
            ResultType::Probability { .. } => "probability",
            ResultType::Amplitude { .. } => "amplitude",
            ResultType::Expectation { .. } => "expectation",
            ResultType::Sample { .. } => "sample",
            ResultType::Variance { .. } => "variance",
        }
    }

    /// Explicit target qubits, if any.
    pub fn targets(&self) -> &[QubitId] {
        match self {
            ResultType::DensityMatrix { targets }
            | ResultType::Probability { targets }
            | ResultType::Expectation { targets, .. }
            | ResultType::Sample { targets, .. }
            | ResultType::Variance { targets, .. } => targets.as_deref().unwrap_or(&[]),
            ResultType::StateVector | ResultType::Amplitude { .. } => &[],
        }
    }

    /// The observable factors, for measurement result types.
    pub fn observable(&self) -> Option<&[Observable]> {
        match self {
            ResultType::Expectation { observable, .. }
            | ResultType::Sample { observable, .. }
            | ResultType::Variance { observable, .. } => Some(observable),
            _ => None,
        }
    }
}
