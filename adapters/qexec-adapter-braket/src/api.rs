//! AWS Braket API client wrapper.
//!
//! Wraps the AWS SDK for Braket and S3: task creation, status polling,
//! result retrieval and provisioning of the result bucket.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{BraketError, BraketResult};

/// Where the client reads credentials and writes results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// AWS region.
    pub region: String,
    /// S3 bucket for task results.
    pub s3_bucket: String,
    /// S3 key prefix for task results.
    pub s3_prefix: String,
}

/// AWS Braket API client.
pub struct BraketClient {
    /// Braket SDK client.
    braket: aws_sdk_braket::Client,
    /// S3 SDK client for result retrieval.
    s3: aws_sdk_s3::Client,
    settings: ClientSettings,
}

impl fmt::Debug for BraketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BraketClient")
            .field("s3_bucket", &self.settings.s3_bucket)
            .field("s3_prefix", &self.settings.s3_prefix)
            .field("region", &self.settings.region)
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

impl BraketClient {
    /// Create a new Braket client.
    ///
    /// Loads AWS credentials from the default chain (environment, SSO, config files, IAM role).
    pub async fn new(settings: ClientSettings) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(60))
                    .connect_timeout(Duration::from_secs(10))
                    .build(),
            )
            .load()
            .await;

        Self {
            braket: aws_sdk_braket::Client::new(&config),
            s3: aws_sdk_s3::Client::new(&config),
            settings,
        }
    }

    /// Make sure the result bucket exists, creating it when absent.
    pub async fn ensure_bucket(&self) -> BraketResult<()> {
        let bucket = &self.settings.s3_bucket;
        match self.s3.head_bucket().bucket(bucket).send().await {
            Ok(_) => {
                debug!(bucket = %bucket, "result bucket exists");
                return Ok(());
            }
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {}
            Err(e) => return Err(BraketError::S3Error(e.to_string())),
        }

        let mut request = self.s3.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint.
        if self.settings.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(
                        self.settings.region.as_str(),
                    ))
                    .build(),
            );
        }
        request
            .send()
            .await
            .map_err(|e| BraketError::S3Error(e.to_string()))?;

        info!(bucket = %bucket, region = %self.settings.region, "created result bucket");
        Ok(())
    }

    /// Create a quantum task from a JAQCD program.
    pub async fn create_task(
        &self,
        device_arn: &str,
        program: &str,
        shots: u32,
    ) -> BraketResult<String> {
        let resp = self
            .braket
            .create_quantum_task()
            .device_arn(device_arn)
            .action(program)
            .shots(i64::from(shots))
            .output_s3_bucket(&self.settings.s3_bucket)
            .output_s3_key_prefix(&self.settings.s3_prefix)
            .client_token(uuid::Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|e| BraketError::BraketApi(e.to_string()))?;

        Ok(resp.quantum_task_arn().to_string())
    }

    /// Get quantum task status.
    pub async fn get_task_status(&self, task_arn: &str) -> BraketResult<TaskStatus> {
        let resp = self
            .braket
            .get_quantum_task()
            .quantum_task_arn(task_arn)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("ResourceNotFoundException") {
                    BraketError::TaskNotFound(task_arn.to_string())
                } else {
                    BraketError::BraketApi(e.to_string())
                }
            })?;

        let status = match resp.status() {
            aws_sdk_braket::types::QuantumTaskStatus::Created => TaskStatus::Created,
            aws_sdk_braket::types::QuantumTaskStatus::Queued => TaskStatus::Queued,
            aws_sdk_braket::types::QuantumTaskStatus::Running => TaskStatus::Running,
            aws_sdk_braket::types::QuantumTaskStatus::Completed => TaskStatus::Completed,
            aws_sdk_braket::types::QuantumTaskStatus::Failed => TaskStatus::Failed(
                resp.failure_reason()
                    .unwrap_or("Unknown failure")
                    .to_string(),
            ),
            aws_sdk_braket::types::QuantumTaskStatus::Cancelling => TaskStatus::Cancelling,
            aws_sdk_braket::types::QuantumTaskStatus::Cancelled => TaskStatus::Cancelled,
            _ => TaskStatus::Failed("Unknown status".to_string()),
        };

        Ok(status)
    }

    /// Get task result from S3.
    ///
    /// Braket stores results as JSON in the configured S3 bucket under
    /// `{prefix}/{task_id}/results.json`.
    pub async fn get_task_result(&self, task_arn: &str) -> BraketResult<TaskResult> {
        let key = result_key(&self.settings.s3_prefix, task_arn)?;

        let resp = self
            .s3
            .get_object()
            .bucket(&self.settings.s3_bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| BraketError::S3Error(e.to_string()))?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| BraketError::S3Error(e.to_string()))?;

        let result: TaskResult = serde_json::from_slice(&body.into_bytes())?;
        Ok(result)
    }
}

/// S3 key of a task's results document.
fn result_key(prefix: &str, task_arn: &str) -> BraketResult<String> {
    // arn:aws:braket:<region>:<account>:quantum-task/<id>
    let task_id = task_arn
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && *id != task_arn)
        .ok_or_else(|| BraketError::ResultParseError(format!("not a task ARN: {task_arn}")))?;
    Ok(format!("{prefix}/{task_id}/results.json"))
}

/// Quantum task status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task has been created.
    Created,
    /// Task is queued.
    Queued,
    /// Task is running.
    Running,
    /// Task completed successfully.
    Completed,
    /// Task failed with reason.
    Failed(String),
    /// Task is being cancelled.
    Cancelling,
    /// Task was cancelled.
    Cancelled,
}

/// Task result from Braket (stored in S3).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Measurement counts (bitstring -> count).
    #[serde(default)]
    pub measurement_counts: Option<HashMap<String, u64>>,
    /// Measurement probabilities (bitstring -> probability).
    #[serde(default)]
    pub measurement_probabilities: Option<HashMap<String, f64>>,
    /// Raw measurements, one array of bits per shot.
    #[serde(default)]
    pub measurements: Option<Vec<Vec<u8>>>,
    /// Qubits the bits of each measurement belong to.
    #[serde(default)]
    pub measured_qubits: Option<Vec<u32>>,
}
