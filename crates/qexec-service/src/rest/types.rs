//! JSON request/response types of the HTTP API.
//!
//! Field names are kebab-case on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use qexec_adapter_sim::LOCAL_SIMULATOR;
use qexec_jaqcd::CircuitMetrics;

use crate::params::InputParams;
use crate::pipeline::JobParams;
use crate::source::CircuitSource;
use crate::storage::ResultRecord;

// ── Requests ──────────────────────────────────────────────────────────────

/// POST /execute
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecuteRequest {
    /// Target backend. Required.
    pub qpu_name: Option<String>,
    pub impl_language: Option<String>,
    pub impl_url: Option<String>,
    /// Base64-encoded implementation.
    pub impl_data: Option<String>,
    /// Inline JAQCD program, as a JSON string.
    pub braket_ir: Option<String>,
    pub bearer_token: Option<String>,
    #[serde(default = "default_shots")]
    pub shots: u32,
    #[serde(default)]
    pub input_params: InputParams,
    /// Backend credential when not passed through `input-params`.
    pub token: Option<String>,
}

/// POST /transpile
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TranspileRequest {
    /// Backend whose depth computation is used; `local-simulator` if absent.
    pub qpu_name: Option<String>,
    pub impl_language: Option<String>,
    pub impl_url: Option<String>,
    pub impl_data: Option<String>,
    pub braket_ir: Option<String>,
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub input_params: InputParams,
    pub token: Option<String>,
}

fn default_shots() -> u32 {
    1024
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl ExecuteRequest {
    /// Requested backend name, if one was given.
    pub fn backend(&self) -> Option<&str> {
        self.qpu_name.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Convert into job parameters for `backend`.
    ///
    /// A `token` input parameter wins over the top-level `token` field.
    pub fn into_params(self, backend: &str) -> JobParams {
        let mut input_params = self.input_params;
        let token = input_params.take_token().or(non_empty(self.token));
        let source = CircuitSource::select(
            self.braket_ir,
            self.impl_url,
            self.impl_data,
            self.impl_language.as_deref(),
        );

        JobParams {
            backend: backend.to_string(),
            source,
            shots: self.shots,
            bearer_token: non_empty(self.bearer_token),
            token,
            input_params,
        }
    }
}

impl TranspileRequest {
    pub fn into_params(self) -> JobParams {
        let backend = self
            .qpu_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(LOCAL_SIMULATOR)
            .to_string();
        let mut input_params = self.input_params;
        let token = input_params.take_token().or(non_empty(self.token));
        let source = CircuitSource::select(
            self.braket_ir,
            self.impl_url,
            self.impl_data,
            self.impl_language.as_deref(),
        );

        JobParams {
            backend,
            source,
            shots: 1,
            bearer_token: non_empty(self.bearer_token),
            token,
            input_params,
        }
    }
}

// ── Responses ─────────────────────────────────────────────────────────────

/// 202 body of POST /execute
#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    #[serde(rename = "Location")]
    pub location: String,
}

/// GET /results/{id}
///
/// `result`, `backend` and `shots` appear only once the job is complete.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub id: String,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shots: Option<u32>,
}

impl From<ResultRecord> for ResultResponse {
    fn from(record: ResultRecord) -> Self {
        if record.complete {
            Self {
                id: record.id,
                complete: true,
                result: record.result,
                backend: Some(record.backend),
                shots: Some(record.shots),
            }
        } else {
            Self {
                id: record.id,
                complete: false,
                result: None,
                backend: None,
                shots: None,
            }
        }
    }
}

/// 200 body of a successful POST /transpile
#[derive(Debug, Serialize)]
pub struct TranspileResponse {
    #[serde(flatten)]
    pub metrics: CircuitMetrics,
    #[serde(rename = "transpiled-braket-ir")]
    pub transpiled_braket_ir: String,
}

/// 200 body of a failed POST /transpile
#[derive(Debug, Serialize)]
pub struct TranspileFailure {
    pub error: &'static str,
}

/// GET /version
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}
