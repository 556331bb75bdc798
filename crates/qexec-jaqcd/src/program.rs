//! Wire types for `braket.ir.jaqcd.program`.
//!
//! Field names and optionality follow the published schema. Unknown fields
//! (such as `basis_rotation_instructions`) are accepted and ignored.

use serde::{Deserialize, Serialize};

/// Schema name of a JAQCD program.
pub const PROGRAM_SCHEMA: &str = "braket.ir.jaqcd.program";

/// Schema version emitted by [`crate::encode`].
pub const PROGRAM_VERSION: &str = "1";

/// A complex number as a `[real, imaginary]` pair.
pub type WireComplex = [f64; 2];

/// A matrix as rows of complex entries, row-major.
pub type WireMatrix = Vec<Vec<WireComplex>>;

/// `braketSchemaHeader`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaHeader {
    /// Schema name.
    pub name: String,
    /// Schema version.
    pub version: String,
}

impl Default for SchemaHeader {
    fn default() -> Self {
        Self {
            name: PROGRAM_SCHEMA.to_string(),
            version: PROGRAM_VERSION.to_string(),
        }
    }
}

/// A JAQCD program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Schema header.
    #[serde(rename = "braketSchemaHeader", default)]
    pub braket_schema_header: SchemaHeader,
    /// Instructions in execution order.
    pub instructions: Vec<ProgramInstruction>,
    /// Declared result types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ProgramResult>>,
}

/// An angle is a number, or the name of a free parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Angle {
    /// Concrete angle in radians.
    Value(f64),
    /// Name of a parameter bound at execution time.
    Parameter(String),
}

/// One JAQCD instruction.
///
/// Which operand fields are present depends on `type`; singular and plural
/// forms (`control`/`controls`, `target`/`targets`) are both accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramInstruction {
    /// Operation name.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<Angle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<WireMatrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrices: Option<Vec<WireMatrix>>,
}

impl ProgramInstruction {
    /// Control operands, singular form first.
    pub fn all_controls(&self) -> Vec<u32> {
        self.control
            .into_iter()
            .chain(self.controls.iter().flatten().copied())
            .collect()
    }

    /// Target operands, singular form first.
    pub fn all_targets(&self) -> Vec<u32> {
        self.target
            .into_iter()
            .chain(self.targets.iter().flatten().copied())
            .collect()
    }
}

/// One declared result type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramResult {
    /// Result type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Observable factors, by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observable: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<String>>,
}
