//! JAQCD program → circuit model.
//!
//! Instruction types map to circuit operations through one explicit `match`;
//! anything outside it is rejected.

use qexec_ir::{
    Circuit, Complex64, Instruction, InstructionKind, NoiseModel, Observable,
    ParameterExpression, QubitId, ResultType, StandardGate,
};
use tracing::trace;

use crate::error::{JaqcdError, JaqcdResult};
use crate::program::{Angle, Program, ProgramInstruction, ProgramResult, WireMatrix};

/// Every instruction type the decoder accepts.
pub const VOCABULARY: &[&str] = &[
    "i",
    "h",
    "x",
    "y",
    "z",
    "s",
    "si",
    "t",
    "ti",
    "v",
    "vi",
    "rx",
    "ry",
    "rz",
    "phaseshift",
    "cnot",
    "cy",
    "cz",
    "cphaseshift",
    "cphaseshift00",
    "cphaseshift01",
    "cphaseshift10",
    "swap",
    "iswap",
    "ecr",
    "pswap",
    "xy",
    "xx",
    "yy",
    "zz",
    "ccnot",
    "cswap",
    "unitary",
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

/// Decode a JAQCD program from its JSON text.
pub fn decode(ir: &str) -> JaqcdResult<Circuit> {
    let program: Program = serde_json::from_str(ir)?;
    decode_program(&program)
}

/// Decode a parsed JAQCD program.
///
/// Either the whole program decodes or an error is returned; no partial
/// circuit escapes.
pub fn decode_program(program: &Program) -> JaqcdResult<Circuit> {
    let mut circuit = Circuit::new();

    for (index, wire) in program.instructions.iter().enumerate() {
        let instruction = decode_instruction(index, wire)?;
        trace!(index, kind = %wire.kind, "decoded instruction");
        circuit
            .push(instruction)
            .map_err(|source| JaqcdError::Circuit {
                index,
                kind: wire.kind.clone(),
                source,
            })?;
    }

    for (index, wire) in program.results.iter().flatten().enumerate() {
        circuit.add_result_type(decode_result(index, wire)?);
    }

    Ok(circuit)
}

/// Optional instruction fields, consumed as the operation asks for them.
///
/// Whatever is left over afterwards does not belong to the operation.
struct Fields<'a> {
    index: usize,
    kind: &'a str,
    angle: Option<&'a Angle>,
    probability: Option<f64>,
    gamma: Option<f64>,
}

impl<'a> Fields<'a> {
    fn invalid(&self, reason: impl Into<String>) -> JaqcdError {
        JaqcdError::InvalidOperands {
            index: self.index,
            kind: self.kind.to_string(),
            reason: reason.into(),
        }
    }

    fn angle(&mut self) -> JaqcdResult<ParameterExpression> {
        match self.angle.take() {
            Some(Angle::Value(v)) => Ok(ParameterExpression::Constant(*v)),
            Some(Angle::Parameter(name)) => Ok(ParameterExpression::Symbol(name.clone())),
            None => Err(self.invalid("missing angle")),
        }
    }

    fn probability(&mut self) -> JaqcdResult<f64> {
        self.probability
            .take()
            .ok_or_else(|| self.invalid("missing probability"))
    }

    fn gamma(&mut self) -> JaqcdResult<f64> {
        self.gamma.take().ok_or_else(|| self.invalid("missing gamma"))
    }

    fn finish(&self) -> JaqcdResult<()> {
        let leftover: Vec<&str> = [
            self.angle.map(|_| "angle"),
            self.probability.map(|_| "probability"),
            self.gamma.map(|_| "gamma"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if leftover.is_empty() {
            Ok(())
        } else {
            Err(self.invalid(format!("unexpected {}", leftover.join(", "))))
        }
    }
}

fn decode_instruction(index: usize, wire: &ProgramInstruction) -> JaqcdResult<Instruction> {
    let kind = wire.kind.as_str();
    let mut fields = Fields {
        index,
        kind,
        angle: wire.angle.as_ref(),
        probability: wire.probability,
        gamma: wire.gamma,
    };
    let targets: Vec<QubitId> = wire.all_targets().into_iter().map(QubitId).collect();

    // Matrix-bearing operations bind to their targets as a whole; controls
    // play no part.
    if let Some(matrix) = &wire.matrix {
        if kind != "unitary" {
            return Err(fields.invalid("matrix given for a non-unitary instruction"));
        }
        fields.finish()?;
        let gate = StandardGate::unitary(complex_rows(matrix)).map_err(|source| {
            JaqcdError::Circuit {
                index,
                kind: kind.to_string(),
                source,
            }
        })?;
        return Ok(Instruction::gate(gate, targets));
    }
    if let Some(matrices) = &wire.matrices {
        if kind != "kraus" {
            return Err(fields.invalid("matrices given for a non-kraus instruction"));
        }
        fields.finish()?;
        let channel = NoiseModel::kraus(matrices.iter().map(complex_rows).collect()).map_err(
            |source| JaqcdError::Circuit {
                index,
                kind: kind.to_string(),
                source,
            },
        )?;
        return Ok(Instruction::noise(channel, targets));
    }

    let operation = match kind {
        "i" => InstructionKind::Gate(StandardGate::I),
        "h" => InstructionKind::Gate(StandardGate::H),
        "x" => InstructionKind::Gate(StandardGate::X),
        "y" => InstructionKind::Gate(StandardGate::Y),
        "z" => InstructionKind::Gate(StandardGate::Z),
        "s" => InstructionKind::Gate(StandardGate::S),
        "si" => InstructionKind::Gate(StandardGate::Si),
        "t" => InstructionKind::Gate(StandardGate::T),
        "ti" => InstructionKind::Gate(StandardGate::Ti),
        "v" => InstructionKind::Gate(StandardGate::V),
        "vi" => InstructionKind::Gate(StandardGate::Vi),
        "rx" => InstructionKind::Gate(StandardGate::Rx(fields.angle()?)),
        "ry" => InstructionKind::Gate(StandardGate::Ry(fields.angle()?)),
        "rz" => InstructionKind::Gate(StandardGate::Rz(fields.angle()?)),
        "phaseshift" => InstructionKind::Gate(StandardGate::PhaseShift(fields.angle()?)),
        "cnot" => InstructionKind::Gate(StandardGate::CNot),
        "cy" => InstructionKind::Gate(StandardGate::CY),
        "cz" => InstructionKind::Gate(StandardGate::CZ),
        "cphaseshift" => InstructionKind::Gate(StandardGate::CPhaseShift(fields.angle()?)),
        "cphaseshift00" => InstructionKind::Gate(StandardGate::CPhaseShift00(fields.angle()?)),
        "cphaseshift01" => InstructionKind::Gate(StandardGate::CPhaseShift01(fields.angle()?)),
        "cphaseshift10" => InstructionKind::Gate(StandardGate::CPhaseShift10(fields.angle()?)),
        "swap" => InstructionKind::Gate(StandardGate::Swap),
        "iswap" => InstructionKind::Gate(StandardGate::ISwap),
        "ecr" => InstructionKind::Gate(StandardGate::Ecr),
        "pswap" => InstructionKind::Gate(StandardGate::PSwap(fields.angle()?)),
        "xy" => InstructionKind::Gate(StandardGate::XY(fields.angle()?)),
        "xx" => InstructionKind::Gate(StandardGate::XX(fields.angle()?)),
        "yy" => InstructionKind::Gate(StandardGate::YY(fields.angle()?)),
        "zz" => InstructionKind::Gate(StandardGate::ZZ(fields.angle()?)),
        "ccnot" => InstructionKind::Gate(StandardGate::CCNot),
        "cswap" => InstructionKind::Gate(StandardGate::CSwap),
        "bit_flip" => InstructionKind::Noise(NoiseModel::BitFlip {
            probability: fields.probability()?,
        }),
        "phase_flip" => InstructionKind::Noise(NoiseModel::PhaseFlip {
            probability: fields.probability()?,
        }),
        "depolarizing" => InstructionKind::Noise(NoiseModel::Depolarizing {
            probability: fields.probability()?,
        }),
        "two_qubit_depolarizing" => InstructionKind::Noise(NoiseModel::TwoQubitDepolarizing {
            probability: fields.probability()?,
        }),
        "two_qubit_dephasing" => InstructionKind::Noise(NoiseModel::TwoQubitDephasing {
            probability: fields.probability()?,
        }),
        "amplitude_damping" => InstructionKind::Noise(NoiseModel::AmplitudeDamping {
            gamma: fields.gamma()?,
        }),
        "generalized_amplitude_damping" => {
            InstructionKind::Noise(NoiseModel::GeneralizedAmplitudeDamping {
                gamma: fields.gamma()?,
                probability: fields.probability()?,
            })
        }
        "phase_damping" => InstructionKind::Noise(NoiseModel::PhaseDamping {
            gamma: fields.gamma()?,
        }),
        "unitary" => return Err(fields.invalid("missing matrix")),
        "kraus" => return Err(fields.invalid("missing matrices")),
        _ => {
            return Err(JaqcdError::UnknownInstruction {
                index,
                kind: kind.to_string(),
            });
        }
    };
    fields.finish()?;

    let controls: Vec<QubitId> = wire.all_controls().into_iter().map(QubitId).collect();
    let expected_controls = match &operation {
        InstructionKind::Gate(gate) => gate.num_controls() as usize,
        InstructionKind::Noise(_) => 0,
    };
    if controls.len() != expected_controls {
        return Err(fields.invalid(format!(
            "expected {expected_controls} control qubit(s), got {}",
            controls.len()
        )));
    }

    // Positional order: controls, then targets.
    Ok(Instruction {
        kind: operation,
        qubits: controls.into_iter().chain(targets).collect(),
    })
}

fn complex_rows(matrix: &WireMatrix) -> Vec<Vec<Complex64>> {
    matrix
        .iter()
        .map(|row| row.iter().map(|[re, im]| Complex64::new(*re, *im)).collect())
        .collect()
}

fn decode_result(index: usize, wire: &ProgramResult) -> JaqcdResult<ResultType> {
    let invalid = |reason: String| JaqcdError::InvalidOperands {
        index,
        kind: wire.kind.clone(),
        reason,
    };
    let targets = wire
        .targets
        .as_ref()
        .map(|t| t.iter().copied().map(QubitId).collect::<Vec<_>>());

    let observable = || -> JaqcdResult<Vec<Observable>> {
        let names = wire
            .observable
            .as_ref()
            .filter(|names| !names.is_empty())
            .ok_or_else(|| invalid("missing observable".into()))?;
        let factors = names
            .iter()
            .map(|name| name.parse::<Observable>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(e.to_string()))?;
        if let Some(targets) = &targets {
            if targets.len() != factors.len() {
                return Err(invalid(format!(
                    "observable acts on {} qubit(s) but {} target(s) given",
                    factors.len(),
                    targets.len()
                )));
            }
        }
        Ok(factors)
    };

    let result = match wire.kind.as_str() {
        "statevector" => ResultType::StateVector,
        "densitymatrix" => ResultType::DensityMatrix { targets },
        "probability" => ResultType::Probability { targets },
        "amplitude" => ResultType::Amplitude {
            states: wire
                .states
                .clone()
                .ok_or_else(|| invalid("missing states".into()))?,
        },
        "expectation" => ResultType::Expectation {
            observable: observable()?,
            targets,
        },
        "sample" => ResultType::Sample {
            observable: observable()?,
            targets,
        },
        "variance" => ResultType::Variance {
            observable: observable()?,
            targets,
        },
        other => {
            return Err(JaqcdError::UnknownResultType {
                index,
                kind: other.to_string(),
            });
        }
    };
    Ok(result)
}
