//! Backend trait and configuration.
//!
//! The [`Backend`] trait defines the lifecycle for running a circuit:
//!
//! ```text
//!   capabilities() ──→ prepare() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `name()` | sync | yes | `&str` |
//! | `capabilities()` | sync | yes | `&Capabilities` |
//! | `validate()` | sync | provided | `HalResult<()>` |
//! | `depth()` | sync | provided | `HalResult<usize>` |
//! | `prepare()` | async | provided | `HalResult<()>` |
//! | `submit()` | async | yes | `HalResult<JobId>` |
//! | `status()` | async | yes | `HalResult<JobStatus>` |
//! | `result()` | async | yes | `HalResult<ExecutionResult>` |
//! | `wait()` | async | provided | `HalResult<ExecutionResult>` |

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use qexec_ir::Circuit;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;

/// Configuration for a backend instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name the backend was requested under.
    pub name: String,
    /// Credential supplied with the job, if any.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the authentication token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add extra configuration.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("token", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// How long [`Backend::wait`] keeps polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between status queries.
    pub interval: Duration,
    /// Number of status queries before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 1800,
        }
    }
}

/// Trait for quantum backends.
///
/// # Contract
///
/// - `capabilities()` MUST be synchronous and infallible.
/// - `submit()` MUST return a handle whose initial status is `Queued` or later.
/// - `result()` MUST only be called when status is `Completed`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Check a circuit against the backend's width and instruction set.
    fn validate(&self, circuit: &Circuit) -> HalResult<()> {
        let caps = self.capabilities();
        let width = circuit.width();
        if width > caps.num_qubits as usize {
            return Err(HalError::InvalidCircuit(format!(
                "circuit uses {width} qubits, {} supports {}",
                self.name(),
                caps.num_qubits
            )));
        }
        if let Some(instruction) = circuit
            .instructions()
            .iter()
            .find(|i| !caps.supports(i.name()))
        {
            return Err(HalError::Unsupported(format!(
                "instruction '{}' on {}",
                instruction.name(),
                self.name()
            )));
        }
        Ok(())
    }

    /// Longest chain of instructions sharing a qubit, as this backend
    /// schedules them.
    ///
    /// Backends that cannot compute it keep the default, which reports
    /// [`HalError::Unsupported`].
    fn depth(&self, _circuit: &Circuit) -> HalResult<usize> {
        Err(HalError::Unsupported(format!(
            "depth computation on {}",
            self.name()
        )))
    }

    /// One-time provisioning before the first submission. Must be idempotent.
    async fn prepare(&self) -> HalResult<()> {
        Ok(())
    }

    /// Submit a circuit for execution.
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId>;

    /// Get the status of a task.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Get the result of a completed task.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Poll until the task is terminal and return its result.
    ///
    /// `Failed` and `Cancelled` map to [`HalError::JobFailed`] and
    /// [`HalError::JobCancelled`]; running out of attempts to
    /// [`HalError::Timeout`].
    async fn wait(&self, job_id: &JobId, policy: PollPolicy) -> HalResult<ExecutionResult> {
        for attempt in 1..=policy.max_attempts {
            let status = self.status(job_id).await?;
            debug!(task = %job_id, attempt, status = %status, "polled task status");
            match status {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(msg) => return Err(HalError::JobFailed(msg)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
        Err(HalError::Timeout(job_id.0.clone()))
    }
}

/// Trait for creating backends from configuration.
pub trait BackendFactory: Backend + Sized {
    /// Create a backend from configuration.
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}
