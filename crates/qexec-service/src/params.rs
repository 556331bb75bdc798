//! Job input parameters.
//!
//! Wire format: `{"theta": {"rawValue": "0.5", "type": "Float"}}`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use qexec_ir::Circuit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, PipelineResult};

/// Name of the entry that carries the backend credential.
pub const TOKEN_PARAM: &str = "token";

/// A single input parameter.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParam {
    /// Raw value, normally a string.
    #[serde(rename = "rawValue")]
    pub raw_value: Value,
    /// Declared type, informational only.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl InputParam {
    pub fn new(raw_value: impl Into<Value>, kind: impl Into<String>) -> Self {
        Self {
            raw_value: raw_value.into(),
            kind: kind.into(),
        }
    }

    /// The raw value as text.
    pub fn as_text(&self) -> String {
        match &self.raw_value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The raw value as a float, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.raw_value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for InputParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputParam")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Input parameters of a job, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputParams(BTreeMap<String, InputParam>);

impl InputParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, param: InputParam) {
        self.0.insert(name.into(), param);
    }

    pub fn get(&self, name: &str) -> Option<&InputParam> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove the `token` entry and return its value, if non-empty.
    pub fn take_token(&mut self) -> Option<String> {
        self.0
            .remove(TOKEN_PARAM)
            .map(|p| p.as_text())
            .filter(|t| !t.is_empty())
    }

    /// Bind every free parameter of `circuit`.
    ///
    /// A circuit without free parameters is returned as is, whatever the
    /// bindings. Otherwise each free parameter needs a numeric entry.
    pub fn bind(&self, circuit: Circuit) -> PipelineResult<Circuit> {
        let free = circuit.free_parameters();
        if free.is_empty() {
            return Ok(circuit);
        }

        let mut bindings = HashMap::with_capacity(free.len());
        for name in free {
            let param = self.0.get(&name).ok_or_else(|| {
                PipelineError::BindingError(format!("no value for parameter '{name}'"))
            })?;
            let value = param.as_f64().ok_or_else(|| {
                PipelineError::BindingError(format!(
                    "parameter '{name}' is not numeric: {}",
                    param.as_text()
                ))
            })?;
            bindings.insert(name, value);
        }

        circuit
            .bind_parameters(&bindings)
            .map_err(|e| PipelineError::BindingError(e.to_string()))
    }
}

impl FromIterator<(String, InputParam)> for InputParams {
    fn from_iter<I: IntoIterator<Item = (String, InputParam)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qexec_ir::{ParameterExpression, QubitId};
    use serde_json::json;

    fn parameterized() -> Circuit {
        let mut circuit = Circuit::new();
        circuit
            .rx(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        circuit
    }

    #[test]
    fn test_deserialize_wire_format() {
        let params: InputParams = serde_json::from_value(json!({
            "theta": {"rawValue": "0.5", "type": "Float"},
            "shots": {"rawValue": 3, "type": "Integer"},
        }))
        .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("theta").unwrap().as_f64(), Some(0.5));
        assert_eq!(params.get("shots").unwrap().as_f64(), Some(3.0));
    }

    #[test]
    fn test_take_token() {
        let mut params: InputParams = [
            ("token".to_string(), InputParam::new("s3cr3t", "String")),
            ("theta".to_string(), InputParam::new("1.0", "Float")),
        ]
        .into_iter()
        .collect();

        assert_eq!(params.take_token().as_deref(), Some("s3cr3t"));
        assert_eq!(params.len(), 1);
        assert!(params.take_token().is_none());
    }

    #[test]
    fn test_bind_free_parameter() {
        let params: InputParams = [("theta".to_string(), InputParam::new("0.25", "Float"))]
            .into_iter()
            .collect();
        let bound = params.bind(parameterized()).unwrap();
        assert!(bound.free_parameters().is_empty());
    }

    #[test]
    fn test_bind_missing_parameter() {
        let err = InputParams::new().bind(parameterized()).unwrap_err();
        assert!(matches!(err, PipelineError::BindingError(_)));
    }

    #[test]
    fn test_bind_non_numeric_parameter() {
        let params: InputParams = [("theta".to_string(), InputParam::new("half", "String"))]
            .into_iter()
            .collect();
        let err = params.bind(parameterized()).unwrap_err();
        assert!(matches!(err, PipelineError::BindingError(_)));
    }

    #[test]
    fn test_bind_ignores_extra_entries_on_fixed_circuit() {
        let params: InputParams = [("unused".to_string(), InputParam::new("x", "String"))]
            .into_iter()
            .collect();
        let circuit = Circuit::bell().unwrap();
        let bound = params.bind(circuit.clone()).unwrap();
        assert_eq!(bound.num_instructions(), circuit.num_instructions());
    }
}
