//! Property-based tests for JAQCD roundtrip conversion.
//!
//! Tests that JAQCD → circuit → JAQCD → circuit preserves instruction order,
//! arguments and result types.

use proptest::prelude::*;
use qexec_ir::{
    Circuit, Instruction, NoiseModel, Observable, ParameterExpression, QubitId, ResultType,
    StandardGate,
};
use qexec_jaqcd::{JaqcdError, decode, encode, encode_string};

/// Angles that survive a JSON text roundtrip exactly.
fn arb_angle() -> impl Strategy<Value = ParameterExpression> {
    prop_oneof![
        (-64_i32..64).prop_map(|k| ParameterExpression::Constant(f64::from(k) * 0.125)),
        prop::sample::select(vec!["theta", "phi", "gamma_1"]).prop_map(ParameterExpression::symbol),
    ]
}

fn arb_probability() -> impl Strategy<Value = f64> {
    (0_u32..=16).prop_map(|k| f64::from(k) / 16.0)
}

/// Distinct qubits drawn from a register of `num_qubits`.
fn arb_operands(num_qubits: u32, count: usize) -> impl Strategy<Value = Vec<QubitId>> {
    Just((0..num_qubits).map(QubitId).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_map(move |qubits| qubits.into_iter().take(count).collect())
}

fn arb_instruction(num_qubits: u32) -> impl Strategy<Value = Instruction> {
    let one = prop_oneof![
        Just(StandardGate::H),
        Just(StandardGate::X),
        Just(StandardGate::Si),
        Just(StandardGate::Vi),
        arb_angle().prop_map(StandardGate::Rx),
        arb_angle().prop_map(StandardGate::PhaseShift),
    ]
    .prop_flat_map(move |gate| {
        arb_operands(num_qubits, 1).prop_map(move |q| Instruction::gate(gate.clone(), q))
    });

    let two = prop_oneof![
        Just(StandardGate::CNot),
        Just(StandardGate::CZ),
        Just(StandardGate::Swap),
        Just(StandardGate::Ecr),
        arb_angle().prop_map(StandardGate::CPhaseShift10),
        arb_angle().prop_map(StandardGate::XY),
        arb_angle().prop_map(StandardGate::ZZ),
    ]
    .prop_flat_map(move |gate| {
        arb_operands(num_qubits, 2).prop_map(move |q| Instruction::gate(gate.clone(), q))
    });

    let three = prop_oneof![Just(StandardGate::CCNot), Just(StandardGate::CSwap)]
        .prop_flat_map(move |gate| {
            arb_operands(num_qubits, 3).prop_map(move |q| Instruction::gate(gate.clone(), q))
        });

    let noise = prop_oneof![
        arb_probability().prop_map(|probability| NoiseModel::BitFlip { probability }),
        arb_probability().prop_map(|probability| NoiseModel::Depolarizing { probability }),
        arb_probability().prop_map(|gamma| NoiseModel::AmplitudeDamping { gamma }),
        (arb_probability(), arb_probability()).prop_map(|(gamma, probability)| {
            NoiseModel::GeneralizedAmplitudeDamping { gamma, probability }
        }),
    ]
    .prop_flat_map(move |model| {
        arb_operands(num_qubits, 1).prop_map(move |q| Instruction::noise(model.clone(), q))
    });

    prop_oneof![4 => one, 3 => two, 1 => three, 1 => noise]
}

fn arb_result(num_qubits: u32) -> impl Strategy<Value = ResultType> {
    prop_oneof![
        Just(ResultType::StateVector),
        Just(ResultType::Probability { targets: None }),
        arb_operands(num_qubits, 1).prop_map(|t| ResultType::DensityMatrix { targets: Some(t) }),
        (
            prop::sample::select(vec![Observable::X, Observable::Y, Observable::Z, Observable::H]),
            arb_operands(num_qubits, 1)
        )
            .prop_map(|(o, t)| ResultType::Expectation {
                observable: vec![o],
                targets: Some(t)
            }),
    ]
}

/// Generate a random circuit over 3-6 qubits.
fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (3_u32..=6).prop_flat_map(|num_qubits| {
        (
            prop::collection::vec(arb_instruction(num_qubits), 1..=15),
            prop::collection::vec(arb_result(num_qubits), 0..=3),
        )
            .prop_map(|(instructions, results)| {
                let mut circuit = Circuit::new();
                for instruction in instructions {
                    circuit
                        .push(instruction)
                        .expect("generated instruction is valid");
                }
                for result in results {
                    circuit.add_result_type(result);
                }
                circuit
            })
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Decode(Encode(Decode(ir))) == Decode(ir).
    #[test]
    fn prop_roundtrip_preserves_circuit(circuit in arb_circuit()) {
        let ir = encode_string(&circuit).unwrap();
        let decoded = decode(&ir).unwrap();
        let again = decode(&encode_string(&decoded).unwrap()).unwrap();

        prop_assert_eq!(&decoded, &circuit);
        prop_assert_eq!(&again, &decoded);
    }

    /// Width is one more than the highest referenced qubit.
    #[test]
    fn prop_width_from_max_index(circuit in arb_circuit()) {
        let decoded = decode(&encode_string(&circuit).unwrap()).unwrap();
        let max_index = decoded
            .instructions()
            .iter()
            .flat_map(|i| i.qubits.iter())
            .chain(decoded.result_types().iter().flat_map(|r| r.targets().iter()))
            .map(|q| q.0 as usize)
            .max();

        prop_assert_eq!(decoded.width(), max_index.map_or(0, |m| m + 1));
    }

    /// Encoding never changes how many instructions there are or their order.
    #[test]
    fn prop_encode_preserves_order(circuit in arb_circuit()) {
        let program = encode(&circuit);
        let names: Vec<&str> = circuit.instructions().iter().map(Instruction::name).collect();
        let wire: Vec<&str> = program.instructions.iter().map(|i| i.kind.as_str()).collect();
        prop_assert_eq!(names, wire);
    }

    /// Any type outside the vocabulary is rejected.
    #[test]
    fn prop_unknown_kind_rejected(kind in "[a-z_]{1,12}") {
        prop_assume!(!qexec_jaqcd::vocabulary().contains(&kind.as_str()));
        let ir = format!(r#"{{"instructions": [{{"type": "{kind}", "target": 0}}]}}"#);
        let err = decode(&ir).unwrap_err();
        let is_unknown = matches!(err, JaqcdError::UnknownInstruction { .. });
        prop_assert!(is_unknown);
    }
}

// ============================================================================
// Fixed examples
// ============================================================================

#[test]
fn test_real_matrix_has_no_imaginary_part() {
    let ir = r#"{"instructions": [{
        "type": "unitary",
        "targets": [0],
        "matrix": [[[1, 0], [0, 0]], [[0, 0], [1, 0]]]
    }]}"#;

    let circuit = decode(ir).unwrap();
    let rows = circuit.instructions()[0]
        .as_gate()
        .and_then(StandardGate::matrix_rows)
        .unwrap();
    assert!(rows.iter().flatten().all(|c| c.im == 0.0));

    let again = decode(&encode_string(&circuit).unwrap()).unwrap();
    assert_eq!(again, circuit);
}

#[test]
fn test_two_qubit_unitary_roundtrip() {
    let ir = r#"{"instructions": [{
        "type": "unitary",
        "targets": [1, 0],
        "matrix": [
            [[1, 0], [0, 0], [0, 0], [0, 0]],
            [[0, 0], [1, 0], [0, 0], [0, 0]],
            [[0, 0], [0, 0], [0, 0], [0, 1]],
            [[0, 0], [0, 0], [0, -1], [0, 0]]
        ]
    }]}"#;

    let circuit = decode(ir).unwrap();
    assert_eq!(circuit.width(), 2);
    assert_eq!(decode(&encode_string(&circuit).unwrap()).unwrap(), circuit);
}

#[test]
fn test_width_covers_result_targets() {
    let ir = r#"{
        "instructions": [{"type": "h", "target": 0}],
        "results": [{"type": "sample", "observable": ["z"], "targets": [4]}]
    }"#;
    assert_eq!(decode(ir).unwrap().width(), 5);
}
