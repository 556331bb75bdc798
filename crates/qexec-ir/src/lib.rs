//! qexec circuit model
//!
//! This crate holds the in-memory form of a circuit that the IR translator
//! decodes into and the backends execute: an ordered list of gate and noise
//! instructions plus the result types the circuit declares.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] addresses a qubit by index
//! - **Gates**: [`StandardGate`] covers the JAQCD gate vocabulary, including
//!   arbitrary unitaries
//! - **Noise**: [`NoiseModel`] channels and the [`NoiseProfile`] a backend
//!   injects
//! - **Parameters**: [`ParameterExpression`] for angles left free until binding
//! - **Result types**: [`ResultType`] and [`Observable`]
//! - **DAG**: [`CircuitDag`] for dependency queries such as depth
//! - **Circuit**: [`Circuit`] ties the above together
//!
//! # Example
//!
//! ```rust
//! use qexec_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::new();
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cnot(QubitId(0), QubitId(1)).unwrap();
//!
//! assert_eq!(circuit.width(), 2);
//! assert_eq!(circuit.depth().unwrap(), 2);
//! ```

pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod noise;
pub mod parameter;
pub mod qubit;
pub mod result_type;

pub use circuit::Circuit;
pub use dag::{CircuitDag, DagEdge, DagNode, NodeIndex};
pub use error::{IrError, IrResult};
pub use gate::StandardGate;
pub use instruction::{Instruction, InstructionKind};
pub use noise::{NoiseModel, NoiseProfile};
pub use num_complex::Complex64;
pub use parameter::ParameterExpression;
pub use qubit::QubitId;
pub use result_type::{Observable, ResultType};
