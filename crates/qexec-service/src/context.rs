//! Shared state assembled once at start-up.

use std::sync::Arc;
use std::time::Duration;

use qexec_adapter_sim::LOCAL_SIMULATOR;
use qexec_hal::BackendRegistry;
use tracing::{info, warn};

use crate::config::Config;
use crate::download::Downloader;
use crate::error::{PipelineError, ServiceError};
use crate::pipeline::Pipeline;
use crate::queue::JobQueue;
use crate::storage::{MemoryStore, ResultStore};

/// Everything the HTTP handlers and workers share.
pub struct ServiceContext {
    pub config: Config,
    pub registry: Arc<BackendRegistry>,
    pub store: Arc<dyn ResultStore>,
    pub queue: JobQueue,
    pub downloader: Downloader,
    pipeline: Arc<Pipeline>,
}

impl ServiceContext {
    /// Open the configured store and start the workers.
    pub async fn build(config: Config) -> Result<Self, ServiceError> {
        config.validate()?;
        let store = open_store(&config).await?;
        fail_orphaned_jobs(store.as_ref()).await?;
        Self::with_parts(config, default_registry(), store)
    }

    /// Assemble a context from an explicit registry and store.
    ///
    /// Must be called inside a tokio runtime; workers are spawned here.
    pub fn with_parts(
        config: Config,
        registry: BackendRegistry,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        // Every instruction the decoder accepts must be executable locally.
        let simulator = registry.create(
            LOCAL_SIMULATOR,
            config.backends.backend_config(LOCAL_SIMULATOR, None),
        )?;
        qexec_jaqcd::check_vocabulary(simulator.capabilities())?;

        let registry = Arc::new(registry);
        let downloader =
            Downloader::new(config.download.timeout())?.with_max_bytes(config.download.max_bytes);
        let pipeline = Arc::new(Pipeline::new(
            registry.clone(),
            store.clone(),
            downloader.clone(),
            config.backends.clone(),
            config.execution.poll_policy(),
        ));
        let queue = JobQueue::start(
            pipeline.clone(),
            config.execution.workers,
            config.execution.queue_capacity,
        );
        info!(backends = ?registry.available_backends(), "service context ready");

        Ok(Self {
            config,
            registry,
            store,
            queue,
            downloader,
            pipeline,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Stop accepting jobs and let queued ones finish.
    pub async fn shutdown(&self) {
        let timeout = Duration::from_secs(self.config.server.shutdown_timeout_seconds);
        self.queue.shutdown(timeout).await;
    }
}

/// Registry with every backend compiled into this build.
pub fn default_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    qexec_adapter_sim::register(&mut registry);
    #[cfg(feature = "braket")]
    qexec_adapter_braket::register(&mut registry);
    registry
}

/// Fail jobs a previous process accepted but never finished.
///
/// The queue lives in memory, so nothing will ever pick them up again.
async fn fail_orphaned_jobs(store: &dyn ResultStore) -> Result<usize, ServiceError> {
    let pending = store.list_pending().await?;
    let payload =
        PipelineError::ExecutionAborted("service restarted before the job ran".to_string())
            .payload();
    for record in &pending {
        warn!(job_id = %record.id, backend = %record.backend, "failing orphaned job");
        store.complete(&record.id, payload.clone()).await?;
    }
    Ok(pending.len())
}

async fn open_store(config: &Config) -> Result<Arc<dyn ResultStore>, ServiceError> {
    match config.storage.backend.as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::error::StoreError;
            use crate::storage::SqliteStore;

            let path = config.storage.sqlite_path.clone();
            info!(%path, "opening sqlite result store");
            let store = tokio::task::spawn_blocking(move || SqliteStore::open(path))
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))??;
            Ok(Arc::new(store))
        }
        _ => {
            info!("using in-memory result store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
