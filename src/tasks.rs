//! Background task runner.
//!
//! A small fixed worker pool for everything that can be slow: schema
//! reconciliation, CSV import/export, dump import, table previews. The
//! foreground only submits work and reacts to completion through the
//! returned handle; it never blocks on I/O itself.
//!
//! Shutdown is bounded-wait-then-force: the queue closes, in-flight work
//! gets up to the grace deadline (the final export-on-exit in
//! particular), then outstanding workers are aborted.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::error::{EngineError, EngineResult};

/// Unique identifier for a submitted job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

struct Job {
    id: JobId,
    label: String,
    work: BoxFuture<'static, ()>,
}

/// Completion handle for a submitted job.
///
/// Delivery is explicit message passing; any marshalling onto a UI
/// foreground thread is the consumer's own, visible step.
pub struct JobHandle<T> {
    pub id: JobId,
    done: oneshot::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Waits for the job's result. Fails with [`EngineError::Shutdown`]
    /// when the runner was torn down before the job could finish.
    pub async fn join(self) -> EngineResult<T> {
        self.done.await.map_err(|_| EngineError::Shutdown)
    }
}

pub struct TaskRunner {
    queue: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskRunner {
    pub const DEFAULT_WORKERS: usize = 2;
    const QUEUE_DEPTH: usize = 64;

    pub fn new(worker_count: usize) -> Self {
        let (queue, rx) = mpsc::channel::<Job>(Self::QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    loop {
                        let job = { rx.lock().await.recv().await };
                        let Some(job) = job else { break };
                        debug!(worker, job = %job.id.0, label = %job.label, "job started");
                        job.work.await;
                        debug!(worker, job = %job.id.0, "job finished");
                    }
                })
            })
            .collect();

        Self { queue, workers }
    }

    /// Submits a unit of work and returns its completion handle.
    ///
    /// Fails with [`EngineError::Shutdown`] once the queue is closed, or
    /// [`EngineError::Execution`] when the bounded queue is full.
    pub fn submit<T, F>(&self, label: &str, work: F) -> EngineResult<JobHandle<T>>
    where
        T: Send + 'static,
        F: std::future::Future<Output = T> + Send + 'static,
    {
        let id = JobId::new();
        let (done_tx, done_rx) = oneshot::channel();

        let job = Job {
            id,
            label: label.to_string(),
            work: Box::pin(async move {
                let _ = done_tx.send(work.await);
            }),
        };

        self.queue.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Closed(_) => EngineError::Shutdown,
            mpsc::error::TrySendError::Full(_) => {
                EngineError::execution_error("task queue is full")
            }
        })?;

        Ok(JobHandle { id, done: done_rx })
    }

    /// Stops accepting work, waits up to `grace` for in-flight jobs, then
    /// forces termination of whatever is still running.
    pub async fn shutdown(self, grace: Duration) {
        let Self { queue, workers } = self;
        drop(queue);

        let aborts: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();
        let drained = tokio::time::timeout(grace, futures::future::join_all(workers)).await;

        if drained.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "grace deadline elapsed; aborting workers");
            for abort in aborts {
                abort.abort();
            }
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WORKERS)
    }
}
