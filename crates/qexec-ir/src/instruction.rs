//! Circuit instructions combining gates or channels with operands.

use serde::{Deserialize, Serialize};

use crate::gate::StandardGate;
use crate::noise::NoiseModel;
use crate::qubit::QubitId;

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(StandardGate),
    /// A noise channel.
    Noise(NoiseModel),
}

/// A complete instruction with operands.
///
/// `qubits` lists the controls first, then the targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: StandardGate, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate),
            qubits: qubits.into_iter().collect(),
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a noise channel instruction.
    pub fn noise(model: NoiseModel, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Noise(model),
            qubits: qubits.into_iter().collect(),
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a noise channel instruction.
    pub fn is_noise(&self) -> bool {
        matches!(self.kind, InstructionKind::Noise(_))
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&StandardGate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            InstructionKind::Noise(_) => None,
        }
    }

    /// Get the channel if this is a noise instruction.
    pub fn as_noise(&self) -> Option<&NoiseModel> {
        match &self.kind {
            InstructionKind::Noise(m) => Some(m),
            InstructionKind::Gate(_) => None,
        }
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Noise(m) => m.name(),
        }
    }

    /// Number of qubits the instruction kind expects.
    pub fn expected_qubits(&self) -> u32 {
        match &self.kind {
            InstructionKind::Gate(g) => g.num_qubits(),
            InstructionKind::Noise(m) => m.num_qubits(),
        }
    }

    /// The control operands.
    pub fn controls(&self) -> &[QubitId] {
        let n = match &self.kind {
            InstructionKind::Gate(g) => g.num_controls() as usize,
            InstructionKind::Noise(_) => 0,
        };
        &self.qubits[..n.min(self.qubits.len())]
    }

    /// The target operands.
    pub fn targets(&self) -> &[QubitId] {
        &self.qubits[self.controls().len()..]
    }

    /// Whether more than one qubit is bound, controls included.
    pub fn is_multi_qubit(&self) -> bool {
        self.qubits.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::single_qubit_gate(StandardGate::H, QubitId(0));
        assert!(inst.is_gate());
        assert_eq!(inst.qubits.len(), 1);
        assert_eq!(inst.name(), "h");
        assert!(!inst.is_multi_qubit());
    }

    #[test]
    fn test_controls_and_targets() {
        let inst = Instruction::gate(StandardGate::CCNot, [QubitId(0), QubitId(1), QubitId(2)]);
        assert_eq!(inst.controls(), &[QubitId(0), QubitId(1)]);
        assert_eq!(inst.targets(), &[QubitId(2)]);

        let swap = Instruction::gate(StandardGate::CSwap, [QubitId(2), QubitId(0), QubitId(1)]);
        assert_eq!(swap.controls(), &[QubitId(2)]);
        assert_eq!(swap.targets(), &[QubitId(0), QubitId(1)]);
    }

    #[test]
    fn test_controlled_gate_counts_as_multi_qubit() {
        let inst = Instruction::two_qubit_gate(StandardGate::CNot, QubitId(0), QubitId(1));
        assert!(inst.is_multi_qubit());
    }

    #[test]
    fn test_noise_instruction() {
        let inst = Instruction::noise(
            NoiseModel::AmplitudeDamping { gamma: 0.01 },
            [QubitId(1)],
        );
        assert!(inst.is_noise());
        assert_eq!(inst.name(), "amplitude_damping");
        assert!(inst.controls().is_empty());
        assert_eq!(inst.targets(), &[QubitId(1)]);
    }
}
