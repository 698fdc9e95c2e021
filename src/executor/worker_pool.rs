//! # Worker Pool
//!
//! Bounded, job-scoped executor that shard items are dispatched onto. A pool is
//! created by an [`ExecutorServiceHandler`](super::handlers::ExecutorServiceHandler)
//! which decides its size; the pool itself only enforces that at most
//! `max_workers` submitted futures run at the same time.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{TaskerError, TaskerResult};

/// Shared worker pool for one job
#[derive(Debug)]
pub struct WorkerPool {
    /// Job name the pool serves
    name: String,
    /// Upper bound on concurrently running submissions
    max_workers: usize,
    /// One permit per worker slot; closed on shutdown
    semaphore: Arc<Semaphore>,
    created_at: DateTime<Utc>,
}

impl WorkerPool {
    /// Create a pool allowing `max_workers` concurrent submissions
    pub fn new(name: impl Into<String>, max_workers: usize) -> TaskerResult<Self> {
        let name = name.into();
        if max_workers == 0 {
            return Err(TaskerError::WorkerPoolError(format!(
                "Worker pool for '{name}' must have at least one worker"
            )));
        }
        if max_workers > Semaphore::MAX_PERMITS {
            return Err(TaskerError::WorkerPoolError(format!(
                "Worker pool for '{name}' requested {max_workers} workers, limit is {}",
                Semaphore::MAX_PERMITS
            )));
        }

        info!(
            job_name = %name,
            max_workers = max_workers,
            "🏊 POOL: Created worker pool"
        );

        Ok(Self {
            name,
            max_workers,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            created_at: Utc::now(),
        })
    }

    /// Submit a future to the pool.
    ///
    /// The returned handle resolves once the future has acquired a worker slot
    /// and completed. Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, future: F) -> TaskerResult<JoinHandle<TaskerResult<F::Output>>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.is_shutdown() {
            return Err(TaskerError::WorkerPoolError(format!(
                "Worker pool for '{}' is shut down",
                self.name
            )));
        }

        let semaphore = Arc::clone(&self.semaphore);
        let name = self.name.clone();
        Ok(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.map_err(|_| {
                TaskerError::WorkerPoolError(format!(
                    "Worker pool for '{name}' shut down before submission started"
                ))
            })?;
            Ok(future.await)
        }))
    }

    /// Stop accepting submissions. Submissions already holding a slot finish normally.
    pub fn shutdown(&self) {
        if !self.semaphore.is_closed() {
            debug!(job_name = %self.name, "🛑 POOL: Shutting down worker pool");
            self.semaphore.close();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Worker slots not currently in use
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
