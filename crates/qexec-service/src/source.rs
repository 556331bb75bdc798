//! Where a job's circuit comes from.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use qexec_ir::Circuit;

use crate::download::Downloader;
use crate::error::{PipelineError, PipelineResult};

/// `impl-language` value that marks a URL or inline data as JAQCD IR.
pub const IR_LANGUAGE: &str = "braket-ir";

/// The one circuit source a job is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitSource {
    /// Inline JAQCD program.
    Ir(String),
    /// JAQCD program behind a URL.
    IrUrl(String),
    /// Base64-encoded JAQCD program.
    IrData(String),
    /// Source code in another language, which is never executed.
    Script { language: String },
}

impl CircuitSource {
    /// Pick the source from request fields.
    ///
    /// Inline IR wins over a URL, which wins over inline data. Empty fields
    /// count as absent. `None` if no source was supplied.
    pub fn select(
        braket_ir: Option<String>,
        impl_url: Option<String>,
        impl_data: Option<String>,
        impl_language: Option<&str>,
    ) -> Option<Self> {
        let present = |field: Option<String>| field.filter(|s| !s.trim().is_empty());
        let language = impl_language.unwrap_or_default().trim();
        let is_ir = language.eq_ignore_ascii_case(IR_LANGUAGE);

        if let Some(ir) = present(braket_ir) {
            return Some(CircuitSource::Ir(ir));
        }
        let script = || CircuitSource::Script {
            language: language.to_string(),
        };
        if let Some(url) = present(impl_url) {
            return Some(if is_ir { CircuitSource::IrUrl(url) } else { script() });
        }
        present(impl_data).map(|data| if is_ir { CircuitSource::IrData(data) } else { script() })
    }

    /// Obtain and decode the circuit.
    pub async fn load(
        &self,
        downloader: &Downloader,
        bearer_token: Option<&str>,
    ) -> PipelineResult<Circuit> {
        let ir = match self {
            CircuitSource::Ir(ir) => ir.clone(),
            CircuitSource::IrUrl(url) => downloader.fetch(url, bearer_token).await?,
            CircuitSource::IrData(data) => decode_base64(data)?,
            CircuitSource::Script { language } => {
                return Err(PipelineError::UnsupportedOperation(format!(
                    "circuits from '{language}' source code are not executed; submit {IR_LANGUAGE}"
                )));
            }
        };
        Ok(qexec_jaqcd::decode(&ir)?)
    }
}

fn decode_base64(data: &str) -> PipelineResult<String> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| PipelineError::MalformedIr(format!("impl-data is not base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| PipelineError::MalformedIr(format!("impl-data is not UTF-8: {e}")))
}
