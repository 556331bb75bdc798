//! AWS Braket backend implementation.

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument};

use qexec_hal::{
    Backend, BackendConfig, BackendFactory, Capabilities, Counts, ExecutionResult, HalError,
    HalResult, JobId, JobStatus,
};
use qexec_ir::Circuit;
use qexec_jaqcd::encode_string;

use crate::api::{BraketClient, ClientSettings, TaskResult, TaskStatus};
use crate::device::{capabilities_for_device, resolve_device};
use crate::error::{BraketError, BraketResult};

/// Maximum number of cached jobs before eviction of terminal entries.
const MAX_CACHED_JOBS: usize = 10_000;

/// Default S3 key prefix for task results.
pub const DEFAULT_S3_PREFIX: &str = "qexec-results";

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// A cached job entry.
struct CachedJob {
    /// Job status.
    status: JobStatus,
    /// Cached result (if completed).
    result: Option<ExecutionResult>,
    /// Number of shots requested at submission time (used to convert
    /// probability-only result formats to approximate counts).
    shots: u32,
}

/// AWS Braket backend adapter.
///
/// One instance per device. The SDK client is built on first use, so
/// constructing a backend never touches the network.
pub struct BraketBackend {
    /// Name the backend was requested under.
    name: String,
    /// Device ARN.
    device_arn: String,
    capabilities: Capabilities,
    settings: ClientSettings,
    client: OnceCell<Arc<BraketClient>>,
    bucket_ready: OnceCell<()>,
    /// Job cache: task ARN -> cached job.
    jobs: Mutex<FxHashMap<String, CachedJob>>,
}

impl BraketBackend {
    /// Create a backend for a device name or ARN.
    pub fn new(name: impl Into<String>, settings: ClientSettings) -> BraketResult<Self> {
        let name = name.into();
        let device_arn =
            resolve_device(&name).ok_or_else(|| BraketError::InvalidDeviceArn(name.clone()))?;
        let capabilities = capabilities_for_device(&device_arn);

        Ok(Self {
            name,
            device_arn,
            capabilities,
            settings,
            client: OnceCell::new(),
            bucket_ready: OnceCell::new(),
            jobs: Mutex::new(FxHashMap::default()),
        })
    }

    /// Get the device ARN.
    pub fn device_arn(&self) -> &str {
        &self.device_arn
    }

    async fn client(&self) -> &Arc<BraketClient> {
        self.client
            .get_or_init(|| async {
                debug!(region = %self.settings.region, "building Braket client");
                Arc::new(BraketClient::new(self.settings.clone()).await)
            })
            .await
    }

    /// Parse task result into execution counts.
    fn parse_result(result: &TaskResult, submitted_shots: u32) -> Counts {
        let mut counts = Counts::new();

        // Prefer measurementCounts (bitstring -> count)
        if let Some(measurement_counts) = &result.measurement_counts {
            for (bitstring, &count) in measurement_counts {
                counts.insert(bitstring.clone(), count);
            }
            return counts;
        }

        // Fall back to raw measurements (array of arrays)
        if let Some(measurements) = &result.measurements {
            for measurement in measurements {
                let bitstring: String = measurement
                    .iter()
                    .map(|b| if *b == 0 { '0' } else { '1' })
                    .collect();
                counts.insert(bitstring, 1);
            }
            return counts;
        }

        // Fall back to measurementProbabilities
        if let Some(probs) = &result.measurement_probabilities {
            let total_shots = f64::from(submitted_shots.max(1));
            for (bitstring, &prob) in probs {
                let count = (prob * total_shots).max(0.0).round() as u64;
                if count > 0 {
                    counts.insert(bitstring.clone(), count);
                }
            }
        }

        counts
    }
}

/// Read client settings from `extra`, falling back to the environment.
///
/// - `s3_bucket` / `QEXEC_BRAKET_S3_BUCKET` (required)
/// - `s3_prefix` / `QEXEC_BRAKET_S3_PREFIX` (default `qexec-results`)
/// - `region` / `AWS_REGION` (default `us-east-1`)
fn settings_from_config(config: &BackendConfig) -> BraketResult<ClientSettings> {
    let lookup = |key: &str, var: &str| {
        config
            .extra
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .or_else(|| std::env::var(var).ok())
            .filter(|v| !v.is_empty())
    };

    Ok(ClientSettings {
        s3_bucket: lookup("s3_bucket", "QEXEC_BRAKET_S3_BUCKET")
            .ok_or(BraketError::MissingS3Bucket)?,
        s3_prefix: lookup("s3_prefix", "QEXEC_BRAKET_S3_PREFIX")
            .unwrap_or_else(|| DEFAULT_S3_PREFIX.to_string()),
        region: lookup("region", "AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
    })
}

fn map_task_status(status: TaskStatus) -> JobStatus {
    match status {
        TaskStatus::Created | TaskStatus::Queued => JobStatus::Queued,
        TaskStatus::Running => JobStatus::Running,
        TaskStatus::Completed => JobStatus::Completed,
        TaskStatus::Failed(msg) => JobStatus::Failed(msg),
        TaskStatus::Cancelling | TaskStatus::Cancelled => JobStatus::Cancelled,
    }
}

#[async_trait]
impl Backend for BraketBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[instrument(skip(self), fields(device = %self.device_arn))]
    async fn prepare(&self) -> HalResult<()> {
        let client = self.client().await;
        self.bucket_ready
            .get_or_try_init(|| client.ensure_bucket())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, circuit), fields(device = %self.device_arn))]
    async fn submit(&self, circuit: &Circuit, shots: u32) -> HalResult<JobId> {
        self.validate(circuit)?;
        if shots == 0 || shots > self.capabilities.max_shots {
            return Err(HalError::InvalidShots(format!(
                "{shots} is outside 1..={}",
                self.capabilities.max_shots
            )));
        }

        let program =
            encode_string(circuit).map_err(|e| BraketError::CircuitError(e.to_string()))?;

        let task_arn = self
            .client()
            .await
            .create_task(&self.device_arn, &program, shots)
            .await?;
        info!(task = %task_arn, shots, "created quantum task");

        {
            let mut jobs = self.jobs.lock().await;
            if jobs.len() >= MAX_CACHED_JOBS {
                jobs.retain(|_, j| !j.status.is_terminal());
            }
            jobs.insert(
                task_arn.clone(),
                CachedJob {
                    status: JobStatus::Queued,
                    result: None,
                    shots,
                },
            );
        }

        Ok(JobId(task_arn))
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let task_status = self.client().await.get_task_status(&job_id.0).await?;
        let job_status = map_task_status(task_status);

        {
            let mut jobs = self.jobs.lock().await;
            if let Some(cached) = jobs.get_mut(&job_id.0) {
                cached.status = job_status.clone();
            }
        }

        Ok(job_status)
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        {
            let jobs = self.jobs.lock().await;
            if let Some(result) = jobs.get(&job_id.0).and_then(|j| j.result.clone()) {
                return Ok(result);
            }
        }

        let client = self.client().await;
        match client.get_task_status(&job_id.0).await? {
            TaskStatus::Completed => {}
            TaskStatus::Failed(msg) => return Err(BraketError::TaskFailed(msg).into()),
            TaskStatus::Cancelled | TaskStatus::Cancelling => {
                return Err(BraketError::TaskCancelled(job_id.0.clone()).into());
            }
            _ => return Err(BraketError::TaskPending(job_id.0.clone()).into()),
        }

        let task_result = client.get_task_result(&job_id.0).await?;

        let submitted_shots = {
            let jobs = self.jobs.lock().await;
            jobs.get(&job_id.0).map_or(0, |j| j.shots)
        };

        let counts = Self::parse_result(&task_result, submitted_shots);
        let shots = u32::try_from(counts.total()).unwrap_or(u32::MAX);
        let result = ExecutionResult::new(counts, shots);

        {
            let mut jobs = self.jobs.lock().await;
            if let Some(cached) = jobs.get_mut(&job_id.0) {
                cached.result = Some(result.clone());
                cached.status = JobStatus::Completed;
            }
        }

        Ok(result)
    }
}

impl BackendFactory for BraketBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let settings = settings_from_config(&config)?;
        Ok(Self::new(config.name, settings)?)
    }
}
