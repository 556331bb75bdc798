//! qexec adapter for AWS Braket
//!
//! Submits circuits to Braket devices as JAQCD programs and reads the
//! measurement results back from S3.
//!
//! # Supported Devices
//!
//! | Device | Name | Qubits | Provider |
//! |--------|------|--------|----------|
//! | Rigetti Ankaa-3 | `ankaa-3` | 84 | Rigetti |
//! | IonQ Aria | `aria` | 25 | IonQ |
//! | IonQ Forte | `forte` | 36 | IonQ |
//! | IQM Garnet | `garnet` | 20 | IQM |
//! | Amazon SV1 | `sv1` | 34 | Amazon |
//! | Amazon TN1 | `tn1` | 50 | Amazon |
//! | Amazon DM1 | `dm1` | 17 | Amazon |
//!
//! Any other `arn:aws:braket:` device ARN is accepted as-is and validated
//! by Braket at submission time.
//!
//! # Authentication
//!
//! AWS credentials are loaded from the standard AWS credential chain:
//! environment variables, shared config, SSO, or IAM role.
//!
//! Required environment variables:
//! - `QEXEC_BRAKET_S3_BUCKET`: S3 bucket for storing task results
//!
//! Optional environment variables:
//! - `QEXEC_BRAKET_S3_PREFIX`: S3 key prefix (default: `"qexec-results"`)
//! - `AWS_REGION`: AWS region (default: `"us-east-1"`)
//!
//! The same keys (`s3_bucket`, `s3_prefix`, `region`) may be passed in
//! [`BackendConfig::extra`](qexec_hal::BackendConfig), which takes precedence.
//!
//! # Example
//!
//! ```ignore
//! use qexec_adapter_braket::BraketBackend;
//! use qexec_hal::{Backend, BackendConfig, BackendFactory, PollPolicy};
//! use qexec_ir::Circuit;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = BraketBackend::from_config(BackendConfig::new("sv1"))?;
//!     backend.prepare().await?;
//!
//!     let job_id = backend.submit(&Circuit::bell()?, 100).await?;
//!     let result = backend.wait(&job_id, PollPolicy::default()).await?;
//!     println!("{:?}", result.counts);
//!
//!     Ok(())
//! }
//! ```

mod api;
mod backend;
pub mod device;
mod error;

pub use api::ClientSettings;
pub use backend::{BraketBackend, DEFAULT_REGION, DEFAULT_S3_PREFIX};
pub use error::{BraketError, BraketResult};

use qexec_hal::{Backend, BackendFactory, BackendRegistry};

/// Register every name [`device::resolve_device`] accepts.
pub fn register(registry: &mut BackendRegistry) {
    registry.register_matcher(
        "braket",
        |name| device::resolve_device(name).is_some(),
        |config| Ok(Box::new(BraketBackend::from_config(config)?) as Box<dyn Backend>),
    );
}
