//! The circuit model: ordered instructions plus declared result types.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::dag::CircuitDag;
use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::noise::{NoiseModel, NoiseProfile};
use crate::parameter::ParameterExpression;
use crate::qubit::QubitId;
use crate::result_type::ResultType;

/// A quantum circuit.
///
/// Instruction order is execution order. The number of qubits is not declared
/// up front; it follows from the highest index referenced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    instructions: Vec<Instruction>,
    result_types: Vec<ResultType>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction after checking its operands.
    pub fn push(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        let expected = instruction.expected_qubits();
        let got = u32::try_from(instruction.qubits.len()).unwrap_or(u32::MAX);
        if expected != got {
            return Err(IrError::QubitCountMismatch {
                gate_name: instruction.name().to_string(),
                expected,
                got,
            });
        }

        let mut seen = BTreeSet::new();
        for &qubit in &instruction.qubits {
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: Some(instruction.name().to_string()),
                });
            }
        }

        if let InstructionKind::Noise(model) = &instruction.kind {
            model.validate()?;
        }

        self.instructions.push(instruction);
        Ok(self)
    }

    /// Append a declared result type.
    pub fn add_result_type(&mut self, result_type: ResultType) -> &mut Self {
        self.result_types.push(result_type);
        self
    }

    // =========================================================================
    // Gate shorthands
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(StandardGate::H, qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(StandardGate::X, qubit))
    }

    /// Apply rotation around X.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.push(Instruction::single_qubit_gate(
            StandardGate::Rx(theta.into()),
            qubit,
        ))
    }

    /// Apply CNOT gate.
    pub fn cnot(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.push(Instruction::two_qubit_gate(
            StandardGate::CNot,
            control,
            target,
        ))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The instructions in execution order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The declared result types in order.
    pub fn result_types(&self) -> &[ResultType] {
        &self.result_types
    }

    /// One plus the highest qubit index referenced by any instruction or
    /// result type; zero for a circuit that references none.
    pub fn width(&self) -> usize {
        self.instructions
            .iter()
            .flat_map(|i| i.qubits.iter())
            .chain(self.result_types.iter().flat_map(|r| r.targets().iter()))
            .map(|q| q.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Number of instructions, gates and channels alike.
    pub fn num_instructions(&self) -> usize {
        self.instructions.len()
    }

    /// Longest chain of instructions sharing a qubit.
    pub fn depth(&self) -> IrResult<usize> {
        self.dag()?.depth()
    }

    /// Build the dependency DAG of this circuit.
    pub fn dag(&self) -> IrResult<CircuitDag> {
        CircuitDag::from_instructions(self.width(), &self.instructions)
    }

    /// Names of the parameters that still need a value.
    pub fn free_parameters(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        for angle in self
            .instructions
            .iter()
            .filter_map(Instruction::as_gate)
            .filter_map(StandardGate::angle)
        {
            angle.collect_symbols(&mut set);
        }
        set
    }

    /// Substitute values for every free parameter.
    ///
    /// Bindings for names the circuit does not use are ignored. Fails on the
    /// first free parameter without a binding.
    pub fn bind_parameters(&self, bindings: &HashMap<String, f64>) -> IrResult<Circuit> {
        if let Some(missing) = self
            .free_parameters()
            .into_iter()
            .find(|name| !bindings.contains_key(name))
        {
            return Err(IrError::UnboundParameter(missing));
        }

        let mut bound = self.clone();
        for instruction in &mut bound.instructions {
            let InstructionKind::Gate(gate) = &mut instruction.kind else {
                continue;
            };
            if let Some(angle) = gate.angle_mut() {
                if let ParameterExpression::Symbol(name) = &*angle {
                    let value = bindings
                        .get(name.as_str())
                        .copied()
                        .ok_or_else(|| IrError::UnboundParameter(name.clone()))?;
                    *angle = ParameterExpression::Constant(value);
                }
            }
        }
        Ok(bound)
    }

    /// A copy of this circuit with the profile's channels made explicit.
    ///
    /// Initialization noise is prepended on every qubit up to the width, gate
    /// noise follows each gate on every qubit it binds, and readout noise is
    /// appended on every qubit. Multi-qubit profile channels are skipped at
    /// sites where they do not fit.
    pub fn with_noise(&self, profile: &NoiseProfile) -> Circuit {
        let width = u32::try_from(self.width()).unwrap_or(u32::MAX);
        let all_qubits: Vec<QubitId> = (0..width).map(QubitId).collect();

        let mut instructions = channel_on(profile.initialization.as_ref(), &all_qubits);
        for instruction in &self.instructions {
            instructions.push(instruction.clone());
            if instruction.is_gate() {
                instructions.extend(channel_on(profile.gate.as_ref(), &instruction.qubits));
            }
        }
        instructions.extend(channel_on(profile.readout.as_ref(), &all_qubits));

        Circuit {
            instructions,
            result_types: self.result_types.clone(),
        }
    }

    // =========================================================================
    // Common circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::new();
        circuit.h(QubitId(0))?.cnot(QubitId(0), QubitId(1))?;
        Ok(circuit)
    }

    /// Create a GHZ state circuit on `n` qubits.
    pub fn ghz(n: u32) -> IrResult<Self> {
        let mut circuit = Self::new();
        if n == 0 {
            return Ok(circuit);
        }
        circuit.h(QubitId(0))?;
        for i in 1..n {
            circuit.cnot(QubitId(0), QubitId(i))?;
        }
        Ok(circuit)
    }
}

/// One single-qubit channel instruction per qubit.
fn channel_on(model: Option<&NoiseModel>, qubits: &[QubitId]) -> Vec<Instruction> {
    match model {
        Some(m) if m.num_qubits() == 1 => qubits
            .iter()
            .map(|&q| Instruction::noise(m.clone(), [q]))
            .collect(),
        _ => Vec::new(),
    }
}
