//! Noise channels and noise profiles.
//!
//! Channels are first-class instructions in the circuit model. A
//! [`NoiseProfile`] describes noise a backend injects on its own, and
//! [`crate::Circuit::with_noise`] turns it into explicit channel instructions.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{flatten_operator, unflatten_operator};

/// A noise channel model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoiseModel {
    /// Flips |0⟩ ↔ |1⟩ with the given probability.
    BitFlip {
        /// Flip probability.
        probability: f64,
    },

    /// Applies Z with the given probability.
    PhaseFlip {
        /// Flip probability.
        probability: f64,
    },

    /// Applies X, Y or Z, each with `probability / 3`.
    Depolarizing {
        /// Total error probability.
        probability: f64,
    },

    /// Applies one of the 15 non-identity two-qubit Paulis, each with
    /// `probability / 15`.
    TwoQubitDepolarizing {
        /// Total error probability.
        probability: f64,
    },

    /// Applies IZ, ZI or ZZ, each with `probability / 3`.
    TwoQubitDephasing {
        /// Total error probability.
        probability: f64,
    },

    /// Energy relaxation (T1 decay).
    AmplitudeDamping {
        /// Damping parameter.
        gamma: f64,
    },

    /// Amplitude damping towards a thermal state.
    GeneralizedAmplitudeDamping {
        /// Damping parameter.
        gamma: f64,
        /// Probability of damping towards |0⟩.
        probability: f64,
    },

    /// Dephasing without energy loss (T2 decay).
    PhaseDamping {
        /// Dephasing parameter.
        gamma: f64,
    },

    /// Arbitrary channel given by its Kraus operators.
    Kraus {
        /// Number of target qubits.
        num_qubits: u32,
        /// Row-major Kraus operators, each `2^n × 2^n`.
        matrices: Vec<Vec<Complex64>>,
    },
}

impl NoiseModel {
    /// Every channel name this module can represent.
    pub const NAMES: &'static [&'static str] = &[
        "bit_flip",
        "phase_flip",
        "depolarizing",
        "two_qubit_depolarizing",
        "two_qubit_dephasing",
        "amplitude_damping",
        "generalized_amplitude_damping",
        "phase_damping",
        "kraus",
    ];

    /// Build a Kraus channel from operator rows.
    pub fn kraus(operators: Vec<Vec<Vec<Complex64>>>) -> IrResult<Self> {
        let mut num_qubits = None;
        let mut matrices = Vec::with_capacity(operators.len());

        for rows in operators {
            let (n, flat) = flatten_operator("kraus", rows)?;
            if num_qubits.is_some_and(|expected| expected != n) {
                return Err(IrError::InvalidMatrix {
                    gate_name: "kraus".into(),
                    reason: "Kraus operators differ in dimension".into(),
                });
            }
            num_qubits = Some(n);
            matrices.push(flat);
        }

        let num_qubits = num_qubits.ok_or_else(|| IrError::InvalidMatrix {
            gate_name: "kraus".into(),
            reason: "no Kraus operators given".into(),
        })?;
        Ok(NoiseModel::Kraus {
            num_qubits,
            matrices,
        })
    }

    /// Get the channel name.
    pub fn name(&self) -> &'static str {
        match self {
            NoiseModel::BitFlip { .. } => "bit_flip",
            NoiseModel::PhaseFlip { .. } => "phase_flip",
            NoiseModel::Depolarizing { .. } => "depolarizing",
            NoiseModel::TwoQubitDepolarizing { .. } => "two_qubit_depolarizing",
            NoiseModel::TwoQubitDephasing { .. } => "two_qubit_dephasing",
            NoiseModel::AmplitudeDamping { .. } => "amplitude_damping",
            NoiseModel::GeneralizedAmplitudeDamping { .. } => "generalized_amplitude_damping",
            NoiseModel::PhaseDamping { .. } => "phase_damping",
            NoiseModel::Kraus { .. } => "kraus",
        }
    }

    /// Number of qubits the channel acts on.
    pub fn num_qubits(&self) -> u32 {
        match self {
            NoiseModel::TwoQubitDepolarizing { .. } | NoiseModel::TwoQubitDephasing { .. } => 2,
            NoiseModel::Kraus { num_qubits, .. } => *num_qubits,
            _ => 1,
        }
    }

    /// The probability parameter, if the channel has one.
    pub fn probability(&self) -> Option<f64> {
        match self {
            NoiseModel::BitFlip { probability }
            | NoiseModel::PhaseFlip { probability }
            | NoiseModel::Depolarizing { probability }
            | NoiseModel::TwoQubitDepolarizing { probability }
            | NoiseModel::TwoQubitDephasing { probability }
            | NoiseModel::GeneralizedAmplitudeDamping { probability, .. } => Some(*probability),
            _ => None,
        }
    }

    /// The damping parameter, if the channel has one.
    pub fn gamma(&self) -> Option<f64> {
        match self {
            NoiseModel::AmplitudeDamping { gamma }
            | NoiseModel::GeneralizedAmplitudeDamping { gamma, .. }
            | NoiseModel::PhaseDamping { gamma } => Some(*gamma),
            _ => None,
        }
    }

    /// The Kraus operators as matrix rows, for [`NoiseModel::Kraus`].
    pub fn matrices_rows(&self) -> Option<Vec<Vec<Vec<Complex64>>>> {
        match self {
            NoiseModel::Kraus {
                num_qubits,
                matrices,
            } => Some(
                matrices
                    .iter()
                    .map(|m| unflatten_operator(*num_qubits, m))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Check that probability and gamma lie in `[0, 1]`.
    pub fn validate(&self) -> IrResult<()> {
        for value in self.probability().into_iter().chain(self.gamma()) {
            if !(0.0..=1.0).contains(&value) {
                return Err(IrError::InvalidNoiseParameter {
                    channel: self.name().to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.probability(), self.gamma()) {
            (Some(p), Some(g)) => write!(f, "{}(γ={g:.4}, p={p:.4})", self.name()),
            (Some(p), None) => write!(f, "{}(p={p:.4})", self.name()),
            (None, Some(g)) => write!(f, "{}(γ={g:.4})", self.name()),
            (None, None) => write!(f, "{}", self.name()),
        }
    }
}

/// Noise a backend injects around a circuit.
///
/// Each site is optional. Single-qubit channels are applied per qubit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Applied after every gate, on each qubit the gate touches.
    #[serde(default)]
    pub gate: Option<NoiseModel>,
    /// Applied to every qubit before readout.
    #[serde(default)]
    pub readout: Option<NoiseModel>,
    /// Applied to every qubit at the start of the circuit.
    #[serde(default)]
    pub initialization: Option<NoiseModel>,
}

impl NoiseProfile {
    /// Create a new empty noise profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// The same depolarizing channel at every site.
    pub fn depolarizing(probability: f64) -> Self {
        let channel = NoiseModel::Depolarizing { probability };
        Self {
            gate: Some(channel.clone()),
            readout: Some(channel.clone()),
            initialization: Some(channel),
        }
    }

    /// Check if this profile injects anything at all.
    pub fn is_empty(&self) -> bool {
        self.gate.is_none() && self.readout.is_none() && self.initialization.is_none()
    }
}
