//! Backend capabilities.

use qexec_ir::{NoiseModel, NoiseProfile, StandardGate};
use serde::{Deserialize, Serialize};

/// What a backend can run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Instruction names the backend accepts, in JAQCD naming.
    pub gate_set: Vec<String>,
    /// Maximum number of shots per task.
    pub max_shots: u32,
    /// Whether this is a simulator (`true`) or real hardware (`false`).
    pub is_simulator: bool,
    /// Noise the backend injects into every circuit it runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_profile: Option<NoiseProfile>,
}

impl Capabilities {
    /// Create capabilities for a simulator that accepts every gate and
    /// noise channel.
    pub fn simulator(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: StandardGate::NAMES
                .iter()
                .chain(NoiseModel::NAMES)
                .map(|s| (*s).to_string())
                .collect(),
            max_shots: 100_000,
            is_simulator: true,
            noise_profile: None,
        }
    }

    /// Create capabilities for a gate-based remote device.
    pub fn device(name: impl Into<String>, num_qubits: u32, is_simulator: bool) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            gate_set: StandardGate::NAMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_shots: 100_000,
            is_simulator,
            noise_profile: None,
        }
    }

    /// Also accept noise channels.
    #[must_use]
    pub fn with_noise_channels(mut self) -> Self {
        for name in NoiseModel::NAMES {
            if !self.supports(name) {
                self.gate_set.push((*name).to_string());
            }
        }
        self
    }

    /// Inject `profile` into every circuit.
    #[must_use]
    pub fn with_noise_profile(mut self, profile: NoiseProfile) -> Self {
        self.noise_profile = Some(profile);
        self
    }

    /// Check whether an instruction name is accepted.
    pub fn supports(&self, name: &str) -> bool {
        self.gate_set.iter().any(|g| g == name)
    }
}
