//! Braket JAQCD translator for qexec.
//!
//! Converts between `braket.ir.jaqcd.program` JSON and the [`qexec_ir::Circuit`]
//! model, and computes the metrics reported by the transpile endpoint.
//!
//! # Example: Decoding JAQCD
//!
//! ```rust
//! use qexec_jaqcd::decode;
//!
//! let ir = r#"{
//!     "braketSchemaHeader": {"name": "braket.ir.jaqcd.program", "version": "1"},
//!     "instructions": [
//!         {"type": "h", "target": 0},
//!         {"type": "cnot", "control": 0, "target": 1}
//!     ],
//!     "results": [{"type": "probability"}]
//! }"#;
//!
//! let circuit = decode(ir).unwrap();
//! assert_eq!(circuit.width(), 2);
//! assert_eq!(circuit.num_instructions(), 2);
//! ```
//!
//! # Example: Round-Trip
//!
//! ```rust
//! use qexec_ir::Circuit;
//! use qexec_jaqcd::{decode, encode_string};
//!
//! let circuit = Circuit::ghz(3).unwrap();
//! let ir = encode_string(&circuit).unwrap();
//! assert_eq!(decode(&ir).unwrap(), circuit);
//! ```
//!
//! # Supported Instructions
//!
//! Gates: `i h x y z s si t ti v vi rx ry rz phaseshift cnot cy cz
//! cphaseshift cphaseshift00 cphaseshift01 cphaseshift10 swap iswap ecr pswap
//! xy xx yy zz ccnot cswap unitary`
//!
//! Noise: `bit_flip phase_flip depolarizing two_qubit_depolarizing
//! two_qubit_dephasing amplitude_damping generalized_amplitude_damping
//! phase_damping kraus`
//!
//! Results: `statevector densitymatrix probability amplitude expectation
//! sample variance`

pub mod decode;
pub mod encode;
pub mod error;
pub mod metrics;
pub mod program;

pub use decode::{decode, decode_program};
pub use encode::{encode, encode_string};
pub use error::{JaqcdError, JaqcdResult, MetricsError};
pub use metrics::{CircuitMetrics, MULTI_QUBIT_GATE_DEPTH, metrics};
pub use program::{Program, ProgramInstruction, ProgramResult};

use qexec_hal::Capabilities;

/// Every instruction type [`decode`] accepts.
pub fn vocabulary() -> &'static [&'static str] {
    decode::VOCABULARY
}

/// Check that a backend accepts every instruction type the decoder can
/// produce.
pub fn check_vocabulary(capabilities: &Capabilities) -> JaqcdResult<()> {
    let missing: Vec<String> = vocabulary()
        .iter()
        .filter(|kind| !capabilities.supports(kind))
        .map(|kind| (*kind).to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(JaqcdError::UnsupportedVocabulary(missing))
    }
}
