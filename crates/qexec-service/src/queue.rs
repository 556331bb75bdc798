//! Bounded job queue drained by a fixed pool of workers.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::QueueClosed;
use crate::pipeline::{JobParams, Pipeline};

/// A job waiting for a worker.
#[derive(Debug)]
pub struct QueuedJob {
    pub id: String,
    pub params: JobParams,
}

/// Queue slot held while the accepting handler creates the result row.
///
/// Dropping it without [`Reservation::send`] releases the slot.
pub struct Reservation {
    id: String,
    permit: mpsc::OwnedPermit<QueuedJob>,
}

impl Reservation {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Hand the job to the workers and return its id.
    pub fn send(self, params: JobParams) -> String {
        let id = self.id;
        self.permit.send(QueuedJob {
            id: id.clone(),
            params,
        });
        id
    }
}

pub struct JobQueue {
    sender: RwLock<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobQueue {
    /// Spawn `workers` tasks consuming a channel of `capacity` jobs.
    pub fn start(pipeline: Arc<Pipeline>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(worker, receiver.clone(), pipeline.clone()))
            })
            .collect();
        info!(workers, capacity, "job queue started");

        Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Wait for a free slot and allocate a job id for it.
    pub async fn reserve(&self) -> Result<Reservation, QueueClosed> {
        let sender = self
            .sender
            .read()
            .map_err(|_| QueueClosed)?
            .clone()
            .ok_or(QueueClosed)?;
        let permit = sender.reserve_owned().await.map_err(|_| QueueClosed)?;
        Ok(Reservation {
            id: Uuid::new_v4().to_string(),
            permit,
        })
    }

    pub async fn enqueue(&self, params: JobParams) -> Result<String, QueueClosed> {
        Ok(self.reserve().await?.send(params))
    }

    /// Close the queue and wait up to `timeout` for queued jobs to finish.
    ///
    /// Workers still running after the timeout are aborted.
    pub async fn shutdown(&self, timeout: Duration) {
        if let Ok(mut sender) = self.sender.write() {
            sender.take();
        }

        let mut handles = std::mem::take(&mut *self.workers.lock().await);
        let drained = tokio::time::timeout(timeout, async {
            for handle in handles.iter_mut() {
                if let Err(e) = handle.await {
                    warn!(error = %e, "worker ended abnormally");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(?timeout, "queue did not drain in time, aborting workers");
            for handle in &handles {
                handle.abort();
            }
        } else {
            info!("job queue drained");
        }
    }
}

async fn worker_loop(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedJob>>>,
    pipeline: Arc<Pipeline>,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            debug!(worker, "queue closed, worker exiting");
            return;
        };
        debug!(worker, job_id = %job.id, "dequeued job");
        pipeline.run(&job.id, job.params).await;
    }
}
