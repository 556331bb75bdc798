//! Per-job execution state machine.
//!
//! ```text
//!   Queued ──→ Preparing ──→ Submitted ──→ Polling ──→ Completed
//!                  │             │            │
//!                  └─────────────┴────────────┴──────→ Failed
//! ```
//!
//! Every job ends in exactly one terminal write to the result store, whether
//! it completes, fails, or the pipeline panics.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use qexec_hal::{Backend, BackendRegistry, Counts, HalError, PollPolicy};
use qexec_ir::Circuit;
use qexec_jaqcd::CircuitMetrics;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::config::BackendsConfig;
use crate::download::Downloader;
use crate::error::{PipelineError, PipelineResult};
use crate::params::InputParams;
use crate::source::CircuitSource;
use crate::storage::ResultStore;

/// Attempts at the terminal store write before giving up.
const TERMINAL_WRITE_ATTEMPTS: u32 = 3;

/// Delay before the first retry; grows linearly.
const TERMINAL_WRITE_BACKOFF: Duration = Duration::from_millis(100);

/// Lifecycle stage of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Queued,
    Preparing,
    Submitted,
    Polling,
    Completed,
    Failed,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Queued => "queued",
            JobStage::Preparing => "preparing",
            JobStage::Submitted => "submitted",
            JobStage::Polling => "polling",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything a worker needs to run a job.
#[derive(Clone)]
pub struct JobParams {
    /// Backend name as requested.
    pub backend: String,
    /// Circuit source; `None` if the request named none.
    pub source: Option<CircuitSource>,
    pub shots: u32,
    /// Credential for restricted downloads.
    pub bearer_token: Option<String>,
    /// Credential handed to the backend.
    pub token: Option<String>,
    /// Parameter bindings, without the `token` entry.
    pub input_params: InputParams,
}

impl JobParams {
    pub fn new(backend: impl Into<String>, source: Option<CircuitSource>, shots: u32) -> Self {
        Self {
            backend: backend.into(),
            source,
            shots,
            bearer_token: None,
            token: None,
            input_params: InputParams::new(),
        }
    }
}

impl fmt::Debug for JobParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobParams")
            .field("backend", &self.backend)
            .field("source", &self.source)
            .field("shots", &self.shots)
            .field("bearer_token", &"[REDACTED]")
            .field("token", &"[REDACTED]")
            .field("input_params", &self.input_params)
            .finish()
    }
}

/// Drives jobs from `Preparing` to a terminal stage.
pub struct Pipeline {
    registry: Arc<BackendRegistry>,
    store: Arc<dyn ResultStore>,
    downloader: Downloader,
    backends: BackendsConfig,
    poll: PollPolicy,
}

impl Pipeline {
    pub fn new(
        registry: Arc<BackendRegistry>,
        store: Arc<dyn ResultStore>,
        downloader: Downloader,
        backends: BackendsConfig,
        poll: PollPolicy,
    ) -> Self {
        Self {
            registry,
            store,
            downloader,
            backends,
            poll,
        }
    }

    /// Run a job and write its terminal result.
    #[instrument(skip(self, params), fields(job_id = %id, backend = %params.backend))]
    pub async fn run(&self, id: &str, params: JobParams) {
        let outcome = AssertUnwindSafe(self.execute(&params))
            .catch_unwind()
            .await;

        let payload = match outcome {
            Ok(Ok(counts)) => {
                info!(stage = %JobStage::Completed, shots = counts.total(), "job completed");
                counts_payload(&counts)
            }
            Ok(Err(err)) => {
                warn!(stage = %JobStage::Failed, cause = err.cause(), error = %err, "job failed");
                err.payload()
            }
            Err(_) => {
                error!(stage = %JobStage::Failed, "pipeline panicked");
                PipelineError::ExecutionAborted("internal error".to_string()).payload()
            }
        };

        self.write_terminal(id, payload).await;
    }

    async fn write_terminal(&self, id: &str, payload: Value) {
        for attempt in 1..=TERMINAL_WRITE_ATTEMPTS {
            match self.store.complete(id, payload.clone()).await {
                Ok(true) => return,
                Ok(false) => {
                    warn!("result was already complete");
                    return;
                }
                Err(e) if attempt < TERMINAL_WRITE_ATTEMPTS => {
                    warn!(attempt, error = %e, "terminal write failed, retrying");
                    tokio::time::sleep(TERMINAL_WRITE_BACKOFF * attempt).await;
                }
                Err(e) => {
                    error!(attempts = attempt, error = %e, "failed to write terminal result");
                }
            }
        }
    }

    /// Decode, bind and measure a circuit without submitting it.
    ///
    /// Returns the metrics together with the re-encoded IR.
    #[instrument(skip(self, params), fields(backend = %params.backend))]
    pub async fn transpile(&self, params: &JobParams) -> PipelineResult<(CircuitMetrics, String)> {
        let circuit = self.load_circuit(params).await?;
        let backend = self.create_backend(params)?;
        let (metrics, ir) = tokio::task::spawn_blocking(move || {
            let metrics = qexec_jaqcd::metrics(&circuit, backend.as_ref())?;
            let ir = qexec_jaqcd::encode_string(&circuit)?;
            Ok::<_, PipelineError>((metrics, ir))
        })
        .await
        .map_err(|e| PipelineError::ExecutionAborted(format!("transpile task failed: {e}")))??;
        debug!(depth = metrics.depth, width = metrics.width, "transpiled");
        Ok((metrics, ir))
    }

    async fn load_circuit(&self, params: &JobParams) -> PipelineResult<Circuit> {
        let source = params.source.as_ref().ok_or_else(|| {
            PipelineError::MalformedIr("no braket-ir, impl-url or impl-data supplied".to_string())
        })?;
        let circuit = source
            .load(&self.downloader, params.bearer_token.as_deref())
            .await?;
        params.input_params.bind(circuit)
    }

    fn create_backend(&self, params: &JobParams) -> PipelineResult<Box<dyn Backend>> {
        let config = self
            .backends
            .backend_config(&params.backend, params.token.as_deref());
        self.registry
            .create(&params.backend, config)
            .map_err(|e| backend_not_found(params, e))
    }

    async fn execute(&self, params: &JobParams) -> PipelineResult<Counts> {
        debug!(stage = %JobStage::Preparing, "resolving circuit");
        let circuit = self.load_circuit(params).await?;

        let backend = self.create_backend(params)?;
        backend
            .prepare()
            .await
            .map_err(|e| backend_not_found(params, e))?;

        let handle = backend
            .submit(&circuit, params.shots)
            .await
            .map_err(|e| PipelineError::ExecutionAborted(e.to_string()))?;
        info!(stage = %JobStage::Submitted, task = %handle, width = circuit.width(), "task submitted");

        debug!(stage = %JobStage::Polling, "waiting for task");
        let result = backend
            .wait(&handle, self.poll)
            .await
            .map_err(|e| match e {
                HalError::Timeout(_) => PipelineError::PollTimeout {
                    attempts: self.poll.max_attempts,
                },
                other => PipelineError::ExecutionAborted(other.to_string()),
            })?;

        Ok(result.counts)
    }
}

fn backend_not_found(params: &JobParams, err: HalError) -> PipelineError {
    PipelineError::BackendNotFound {
        name: params.backend.clone(),
        reason: err.to_string(),
    }
}

/// Histogram as persisted: `{bitstring: count}`.
fn counts_payload(counts: &Counts) -> Value {
    Value::Object(
        counts
            .iter()
            .map(|(bits, n)| (bits.clone(), Value::from(*n)))
            .collect::<Map<_, _>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use qexec_hal::{Capabilities, ExecutionResult, HalResult, JobId, JobStatus};
    use serde_json::json;

    use crate::error::{BACKEND_MESSAGE, EXECUTION_MESSAGE, SOURCE_MESSAGE, StoreError, StoreResult};
    use crate::params::InputParam;
    use crate::storage::{MemoryStore, ResultRecord};

    const BELL_IR: &str = r#"{"instructions":[{"type":"h","target":0},{"type":"cnot","control":0,"target":1}]}"#;
    const PARAM_IR: &str = r#"{"instructions":[{"type":"rx","target":0,"angle":"theta"}]}"#;

    /// Reports a fixed status forever and panics on request.
    struct StuckBackend {
        caps: Capabilities,
        status: JobStatus,
        panic_on_submit: bool,
    }

    #[async_trait]
    impl Backend for StuckBackend {
        fn name(&self) -> &str {
            "stuck"
        }

        fn capabilities(&self) -> &Capabilities {
            &self.caps
        }

        async fn submit(&self, _circuit: &Circuit, _shots: u32) -> HalResult<JobId> {
            if self.panic_on_submit {
                panic!("submit exploded");
            }
            Ok(JobId::new("task-1"))
        }

        async fn status(&self, _job_id: &JobId) -> HalResult<JobStatus> {
            Ok(self.status.clone())
        }

        async fn result(&self, _job_id: &JobId) -> HalResult<ExecutionResult> {
            Err(HalError::JobNotFound("task-1".into()))
        }
    }

    /// Memory store whose first `failures` terminal writes error out.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
        attempts: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: AtomicU32::new(failures),
                attempts: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ResultStore for FlakyStore {
        async fn create(&self, id: &str, backend: &str, shots: u32) -> StoreResult<()> {
            self.inner.create(id, backend, shots).await
        }

        async fn get(&self, id: &str) -> StoreResult<Option<ResultRecord>> {
            self.inner.get(id).await
        }

        async fn complete(&self, id: &str, payload: Value) -> StoreResult<bool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Backend("database is locked".into()));
            }
            self.inner.complete(id, payload).await
        }

        async fn list_pending(&self) -> StoreResult<Vec<ResultRecord>> {
            self.inner.list_pending().await
        }
    }

    fn registry() -> Arc<BackendRegistry> {
        let mut registry = BackendRegistry::new();
        qexec_adapter_sim::register(&mut registry);
        for (name, status, panic_on_submit) in [
            ("stuck", JobStatus::Running, false),
            ("doomed", JobStatus::Failed("device offline".into()), false),
            ("explosive", JobStatus::Queued, true),
        ] {
            registry.register_factory(name, move |_config| {
                Ok(Box::new(StuckBackend {
                    caps: Capabilities::simulator("stuck", 4),
                    status: status.clone(),
                    panic_on_submit,
                }) as Box<dyn Backend>)
            });
        }
        Arc::new(registry)
    }

    fn pipeline(store: Arc<dyn ResultStore>) -> Pipeline {
        Pipeline::new(
            registry(),
            store,
            Downloader::new(Duration::from_secs(1)).unwrap(),
            BackendsConfig::default(),
            PollPolicy {
                interval: Duration::from_millis(1),
                max_attempts: 3,
            },
        )
    }

    async fn run(params: JobParams) -> Value {
        let store = Arc::new(MemoryStore::new());
        store.create("job", &params.backend, params.shots).await.unwrap();
        pipeline(store.clone()).run("job", params).await;

        let record = store.get("job").await.unwrap().unwrap();
        assert!(record.complete);
        record.result.unwrap()
    }

    fn bell(backend: &str, shots: u32) -> JobParams {
        JobParams::new(backend, Some(CircuitSource::Ir(BELL_IR.into())), shots)
    }

    #[tokio::test]
    async fn test_local_simulator_completes() {
        let payload = run(bell("local-simulator", 100)).await;
        let total: u64 = payload
            .as_object()
            .unwrap()
            .values()
            .map(|v| v.as_u64().unwrap())
            .sum();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let payload = run(bell("no-such-qpu", 10)).await;
        assert_eq!(
            payload,
            json!({"error": BACKEND_MESSAGE, "cause": "BackendNotFound"})
        );
    }

    #[tokio::test]
    async fn test_missing_source() {
        let payload = run(JobParams::new("local-simulator", None, 10)).await;
        assert_eq!(payload["error"], SOURCE_MESSAGE);
        assert_eq!(payload["cause"], "MalformedIR");
    }

    #[tokio::test]
    async fn test_unbound_parameter() {
        let params = JobParams::new(
            "local-simulator",
            Some(CircuitSource::Ir(PARAM_IR.into())),
            10,
        );
        let payload = run(params).await;
        assert_eq!(payload["error"], EXECUTION_MESSAGE);
        assert_eq!(payload["cause"], "BindingError");
    }

    #[tokio::test]
    async fn test_bound_parameter_runs() {
        let mut params = JobParams::new(
            "local-simulator",
            Some(CircuitSource::Ir(PARAM_IR.into())),
            20,
        );
        params
            .input_params
            .insert("theta", InputParam::new("3.141592653589793", "Float"));
        let payload = run(params).await;
        assert!(payload.get("error").is_none(), "{payload}");
    }

    #[tokio::test]
    async fn test_poll_timeout() {
        let payload = run(bell("stuck", 10)).await;
        assert_eq!(payload["cause"], "PollTimeout");
        assert_eq!(payload["error"], EXECUTION_MESSAGE);
    }

    #[tokio::test]
    async fn test_device_failure_aborts() {
        let payload = run(bell("doomed", 10)).await;
        assert_eq!(payload["cause"], "ExecutionAborted");
    }

    #[tokio::test]
    async fn test_panic_still_completes_job() {
        let payload = run(bell("explosive", 10)).await;
        assert_eq!(payload["cause"], "ExecutionAborted");
    }

    #[tokio::test]
    async fn test_transpile_reports_metrics() {
        let store = Arc::new(MemoryStore::new());
        let (metrics, ir) = pipeline(store)
            .transpile(&bell("local-simulator", 1))
            .await
            .unwrap();
        assert_eq!(metrics.width, 2);
        assert_eq!(metrics.depth, 2);
        assert_eq!(metrics.multi_qubit_gates, 1);
        assert!(ir.contains("cnot"));
    }

    #[tokio::test]
    async fn test_transpile_needs_depth_capability() {
        let store = Arc::new(MemoryStore::new());
        let err = pipeline(store)
            .transpile(&bell("stuck", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn test_terminal_write_is_retried() {
        let store = Arc::new(FlakyStore::new(2));
        store.create("job", "doomed", 10).await.unwrap();
        pipeline(store.clone()).run("job", bell("doomed", 10)).await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
        let record = store.get("job").await.unwrap().unwrap();
        assert!(record.complete);
        assert_eq!(record.result.unwrap()["cause"], "ExecutionAborted");
    }

    #[tokio::test]
    async fn test_terminal_write_gives_up() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        store.create("job", "doomed", 10).await.unwrap();
        pipeline(store.clone()).run("job", bell("doomed", 10)).await;

        assert_eq!(store.attempts.load(Ordering::SeqCst), TERMINAL_WRITE_ATTEMPTS);
        assert!(!store.get("job").await.unwrap().unwrap().complete);
    }

    #[tokio::test]
    async fn test_transpile_rejects_oversized_circuit() {
        let store = Arc::new(MemoryStore::new());
        let params = JobParams::new(
            "local-simulator",
            Some(CircuitSource::Ir(
                r#"{"instructions":[{"type":"x","target":4294967295}]}"#.into(),
            )),
            1,
        );
        let err = pipeline(store).transpile(&params).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_params_debug_redacts_tokens() {
        let mut params = bell("sv1", 1);
        params.token = Some("aws-secret".into());
        params.bearer_token = Some("planqk-secret".into());
        let debug = format!("{params:?}");
        assert!(!debug.contains("secret"));
    }
}
