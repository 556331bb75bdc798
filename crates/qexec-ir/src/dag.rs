//! Dependency DAG over qubit wires.
//!
//! The circuit itself is stored as an ordered instruction list; this graph is
//! built from it on demand to answer scheduling questions such as depth.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex as PetNodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{IrError, IrResult};
use crate::instruction::Instruction;
use crate::qubit::QubitId;

/// Node index type for the circuit DAG.
pub type NodeIndex = PetNodeIndex<u32>;

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq)]
pub enum DagNode {
    /// Input node for a qubit wire.
    In(QubitId),
    /// Output node for a qubit wire.
    Out(QubitId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// An edge in the circuit DAG, labelled with the qubit wire it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: QubitId,
}

/// DAG-based view of a circuit.
///
/// Every qubit wire runs from an `In` node through the operations touching
/// it, in program order, to an `Out` node.
#[derive(Debug, Default)]
pub struct CircuitDag {
    graph: DiGraph<DagNode, DagEdge, u32>,
    qubit_outputs: FxHashMap<QubitId, NodeIndex>,
    /// Maps each wire to the node just before its output node.
    wire_front: FxHashMap<QubitId, NodeIndex>,
}

impl CircuitDag {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the DAG for a sequence of instructions over `num_qubits` wires.
    pub fn from_instructions<'a>(
        num_qubits: usize,
        instructions: impl IntoIterator<Item = &'a Instruction>,
    ) -> IrResult<Self> {
        let mut dag = Self::new();
        for index in 0..num_qubits {
            dag.add_qubit(QubitId::try_from(index)?);
        }
        for instruction in instructions {
            dag.apply(instruction.clone())?;
        }
        Ok(dag)
    }

    /// Add a qubit wire.
    pub fn add_qubit(&mut self, qubit: QubitId) {
        if self.qubit_outputs.contains_key(&qubit) {
            return;
        }
        let in_node = self.graph.add_node(DagNode::In(qubit));
        let out_node = self.graph.add_node(DagNode::Out(qubit));
        self.graph.add_edge(in_node, out_node, DagEdge { wire: qubit });
        self.qubit_outputs.insert(qubit, out_node);
        self.wire_front.insert(qubit, in_node);
    }

    /// Append an instruction at the end of its wires.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<NodeIndex> {
        let gate_name = Some(instruction.name().to_string());

        let expected = instruction.expected_qubits();
        let got = u32::try_from(instruction.qubits.len()).unwrap_or(u32::MAX);
        if expected != got {
            return Err(IrError::QubitCountMismatch {
                gate_name: instruction.name().to_string(),
                expected,
                got,
            });
        }

        let mut seen = FxHashSet::default();
        for &qubit in &instruction.qubits {
            if !self.qubit_outputs.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
            if !seen.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        let qubits = instruction.qubits.clone();
        let op_node = self.graph.add_node(DagNode::Op(instruction));

        for qubit in qubits {
            let out_node = self.qubit_outputs[&qubit];
            let prev_node = self.wire_front[&qubit];

            let eid = self
                .graph
                .edges_directed(prev_node, Direction::Outgoing)
                .find(|e| e.weight().wire == qubit && e.target() == out_node)
                .map(|e| e.id())
                .ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "Missing edge from predecessor to output for wire {qubit}"
                    ))
                })?;
            self.graph.remove_edge(eid);
            self.graph.add_edge(prev_node, op_node, DagEdge { wire: qubit });
            self.graph.add_edge(op_node, out_node, DagEdge { wire: qubit });
            self.wire_front.insert(qubit, op_node);
        }

        Ok(op_node)
    }

    /// Get the number of qubit wires.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubit_outputs.len()
    }

    /// Get the number of operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.graph
            .node_count()
            .saturating_sub(2 * self.qubit_outputs.len())
    }

    /// Length of the longest chain of operations sharing a wire.
    pub fn depth(&self) -> IrResult<usize> {
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|_| IrError::InvalidDag("cycle detected in circuit graph".into()))?;

        let mut depths: FxHashMap<NodeIndex, usize> =
            FxHashMap::with_capacity_and_hasher(order.len(), Default::default());
        let mut max_depth = 0usize;

        for node in order {
            let max_pred_depth = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .map(|e| depths.get(&e.source()).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);

            let node_depth = if self.graph[node].is_op() {
                max_pred_depth + 1
            } else {
                max_pred_depth
            };

            max_depth = max_depth.max(node_depth);
            depths.insert(node, node_depth);
        }

        Ok(max_depth)
    }

    /// Operations in a topological order.
    pub fn topological_ops(&self) -> IrResult<Vec<&Instruction>> {
        let order = petgraph::algo::toposort(&self.graph, None)
            .map_err(|_| IrError::InvalidDag("cycle detected in circuit graph".into()))?;
        Ok(order
            .into_iter()
            .filter_map(|idx| self.graph[idx].instruction())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;
    use crate::noise::NoiseModel;

    #[test]
    fn test_empty_dag() {
        let dag = CircuitDag::new();
        assert_eq!(dag.num_qubits(), 0);
        assert_eq!(dag.num_ops(), 0);
        assert_eq!(dag.depth().unwrap(), 0);
    }

    #[test]
    fn test_bell_state_depth() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));

        dag.apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
            .unwrap();
        dag.apply(Instruction::two_qubit_gate(
            StandardGate::CNot,
            QubitId(0),
            QubitId(1),
        ))
        .unwrap();

        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth().unwrap(), 2);
    }

    #[test]
    fn test_parallel_gates_depth() {
        let instructions = [
            Instruction::single_qubit_gate(StandardGate::H, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::H, QubitId(1)),
        ];
        let dag = CircuitDag::from_instructions(2, &instructions).unwrap();

        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth().unwrap(), 1);
    }

    #[test]
    fn test_noise_counts_towards_depth() {
        let instructions = [
            Instruction::single_qubit_gate(StandardGate::X, QubitId(0)),
            Instruction::noise(NoiseModel::BitFlip { probability: 0.1 }, [QubitId(0)]),
        ];
        let dag = CircuitDag::from_instructions(1, &instructions).unwrap();
        assert_eq!(dag.depth().unwrap(), 2);
    }

    #[test]
    fn test_gate_arity_mismatch() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        dag.add_qubit(QubitId(1));

        let result = dag.apply(Instruction::gate(StandardGate::CNot, [QubitId(0)]));

        match result {
            Err(IrError::QubitCountMismatch {
                gate_name,
                expected,
                got,
            }) => {
                assert_eq!(gate_name, "cnot");
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            _ => panic!("Expected QubitCountMismatch error"),
        }
    }

    #[test]
    fn test_duplicate_qubit_rejected() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        let result = dag.apply(Instruction::gate(StandardGate::Swap, [QubitId(0), QubitId(0)]));
        assert!(matches!(result, Err(IrError::DuplicateQubit { .. })));
    }

    #[test]
    fn test_qubit_not_found_with_context() {
        let mut dag = CircuitDag::new();
        dag.add_qubit(QubitId(0));
        let err = dag
            .apply(Instruction::single_qubit_gate(StandardGate::H, QubitId(5)))
            .unwrap_err();
        assert_eq!(err.to_string(), "Qubit q5 not found in circuit (gate: h)");
    }

    #[test]
    fn test_topological_ops_preserves_wire_order() {
        let instructions = [
            Instruction::single_qubit_gate(StandardGate::H, QubitId(0)),
            Instruction::single_qubit_gate(StandardGate::X, QubitId(0)),
        ];
        let dag = CircuitDag::from_instructions(1, &instructions).unwrap();
        let names: Vec<_> = dag
            .topological_ops()
            .unwrap()
            .iter()
            .map(|i| i.name())
            .collect();
        assert_eq!(names, ["h", "x"]);
    }
}
