//! Circuit model → JAQCD program.

use qexec_ir::{
    Circuit, Complex64, Instruction, InstructionKind, NoiseModel, ParameterExpression, ResultType,
    StandardGate,
};

use crate::error::JaqcdResult;
use crate::program::{
    Angle, Program, ProgramInstruction, ProgramResult, SchemaHeader, WireMatrix,
};

/// Encode a circuit as a JAQCD program.
///
/// Operand fields follow Braket's own emission: `control`/`target` for single
/// operands, `controls`/`targets` otherwise, and always `targets` for matrix
/// operations.
pub fn encode(circuit: &Circuit) -> Program {
    let instructions = circuit.instructions().iter().map(encode_instruction).collect();
    let results: Vec<ProgramResult> = circuit.result_types().iter().map(encode_result).collect();

    Program {
        braket_schema_header: SchemaHeader::default(),
        instructions,
        results: (!results.is_empty()).then_some(results),
    }
}

/// Encode a circuit as JAQCD JSON text.
pub fn encode_string(circuit: &Circuit) -> JaqcdResult<String> {
    Ok(serde_json::to_string(&encode(circuit))?)
}

fn encode_instruction(instruction: &Instruction) -> ProgramInstruction {
    let controls: Vec<u32> = instruction.controls().iter().map(|q| q.0).collect();
    let targets: Vec<u32> = instruction.targets().iter().map(|q| q.0).collect();

    let mut wire = ProgramInstruction {
        kind: instruction.name().to_string(),
        ..ProgramInstruction::default()
    };

    match controls.as_slice() {
        [] => {}
        [single] => wire.control = Some(*single),
        _ => wire.controls = Some(controls),
    }

    let has_matrix = match &instruction.kind {
        InstructionKind::Gate(gate) => {
            wire.angle = gate.angle().map(encode_angle);
            if let StandardGate::Unitary { .. } = gate {
                wire.matrix = gate.matrix_rows().map(|rows| wire_matrix(&rows));
                true
            } else {
                false
            }
        }
        InstructionKind::Noise(model) => {
            wire.probability = model.probability();
            wire.gamma = model.gamma();
            if let NoiseModel::Kraus { .. } = model {
                wire.matrices = model
                    .matrices_rows()
                    .map(|ops| ops.iter().map(|rows| wire_matrix(rows)).collect());
                true
            } else {
                false
            }
        }
    };

    match targets.as_slice() {
        [single] if !has_matrix => wire.target = Some(*single),
        _ => wire.targets = Some(targets),
    }

    wire
}

fn encode_angle(angle: &ParameterExpression) -> Angle {
    match angle {
        ParameterExpression::Constant(value) => Angle::Value(*value),
        ParameterExpression::Symbol(name) => Angle::Parameter(name.clone()),
    }
}

fn wire_matrix(rows: &[Vec<Complex64>]) -> WireMatrix {
    rows.iter()
        .map(|row| row.iter().map(|c| [c.re, c.im]).collect())
        .collect()
}

fn encode_result(result: &ResultType) -> ProgramResult {
    let mut wire = ProgramResult {
        kind: result.name().to_string(),
        ..ProgramResult::default()
    };

    match result {
        ResultType::StateVector => {}
        ResultType::Amplitude { states } => wire.states = Some(states.clone()),
        ResultType::DensityMatrix { targets } | ResultType::Probability { targets } => {
            wire.targets = targets.as_ref().map(|t| t.iter().map(|q| q.0).collect());
        }
        ResultType::Expectation {
            observable,
            targets,
        }
        | ResultType::Sample {
            observable,
            targets,
        }
        | ResultType::Variance {
            observable,
            targets,
        } => {
            wire.observable = Some(observable.iter().map(|o| o.name().to_string()).collect());
            wire.targets = targets.as_ref().map(|t| t.iter().map(|q| q.0).collect());
        }
    }

    wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use qexec_ir::{Observable, QubitId};

    #[test]
    fn test_encode_bell() {
        let circuit = Circuit::bell().unwrap();
        let program = encode(&circuit);

        assert_eq!(program.instructions.len(), 2);
        assert_eq!(program.instructions[0].kind, "h");
        assert_eq!(program.instructions[0].target, Some(0));
        assert_eq!(program.instructions[1].kind, "cnot");
        assert_eq!(program.instructions[1].control, Some(0));
        assert_eq!(program.instructions[1].target, Some(1));
        assert!(program.results.is_none());
    }

    #[test]
    fn test_encode_plural_operands() {
        let json = r#"{"instructions": [
            {"type": "ccnot", "controls": [0, 1], "target": 2},
            {"type": "cswap", "control": 0, "targets": [1, 2]}
        ]}"#;
        let program = encode(&decode(json).unwrap());

        assert_eq!(program.instructions[0].controls, Some(vec![0, 1]));
        assert_eq!(program.instructions[0].target, Some(2));
        assert_eq!(program.instructions[1].control, Some(0));
        assert_eq!(program.instructions[1].targets, Some(vec![1, 2]));
    }

    #[test]
    fn test_encode_unitary_uses_targets() {
        let json = r#"{"instructions": [{
            "type": "unitary",
            "targets": [0],
            "matrix": [[[0, 0], [1, 0]], [[1, 0], [0, 0]]]
        }]}"#;
        let program = encode(&decode(json).unwrap());
        let wire = &program.instructions[0];

        assert_eq!(wire.targets, Some(vec![0]));
        assert_eq!(wire.target, None);
        assert_eq!(
            wire.matrix,
            Some(vec![
                vec![[0.0, 0.0], [1.0, 0.0]],
                vec![[1.0, 0.0], [0.0, 0.0]]
            ])
        );
    }

    #[test]
    fn test_encode_noise_and_results() {
        let json = r#"{
            "instructions": [
                {"type": "h", "target": 0},
                {"type": "amplitude_damping", "target": 0, "gamma": 0.3},
                {"type": "rx", "target": 1, "angle": "theta"}
            ],
            "results": [
                {"type": "variance", "observable": ["x", "z"], "targets": [0, 1]}
            ]
        }"#;
        let circuit = decode(json).unwrap();
        let program = encode(&circuit);

        assert_eq!(program.instructions[1].gamma, Some(0.3));
        assert_eq!(program.instructions[1].probability, None);
        assert_eq!(
            program.instructions[2].angle,
            Some(Angle::Parameter("theta".into()))
        );
        let results = program.results.unwrap();
        assert_eq!(
            results[0].observable,
            Some(vec!["x".to_string(), "z".to_string()])
        );

        assert_eq!(
            circuit.result_types()[0],
            ResultType::Variance {
                observable: vec![Observable::X, Observable::Z],
                targets: Some(vec![QubitId(0), QubitId(1)]),
            }
        );
    }

    #[test]
    fn test_encode_string_has_schema_header() {
        let text = encode_string(&Circuit::bell().unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["braketSchemaHeader"]["name"], "braket.ir.jaqcd.program");
        assert_eq!(value["instructions"][1]["type"], "cnot");
        assert!(value.get("results").is_none());
    }

    #[test]
    fn test_roundtrip_preserves_order() {
        let json = r#"{
            "instructions": [
                {"type": "x", "target": 2},
                {"type": "cphaseshift01", "control": 2, "target": 0, "angle": 0.5},
                {"type": "two_qubit_depolarizing", "targets": [0, 1], "probability": 0.01},
                {"type": "zz", "targets": [1, 2], "angle": 1.25}
            ],
            "results": [{"type": "probability"}, {"type": "amplitude", "states": ["101"]}]
        }"#;
        let circuit = decode(json).unwrap();
        let again = decode(&encode_string(&circuit).unwrap()).unwrap();
        assert_eq!(circuit, again);
    }
}
