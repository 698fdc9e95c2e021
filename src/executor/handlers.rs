//! # Job Handler Capabilities
//!
//! The two swappable behaviours a job can configure through its properties:
//!
//! - [`ExecutorServiceHandler`] decides how the job's worker pool is built
//! - [`JobExceptionHandler`] decides what happens with a failure and how it is
//!   rendered into the round's error map
//!
//! Implementations are looked up by identifier through the
//! [`HandlerCatalog`](crate::registry::HandlerCatalog).

use std::fmt;
use tracing::{debug, error, info};

use super::worker_pool::WorkerPool;
use crate::constants::{handlers, DEFAULT_WORKERS_PER_CPU};
use crate::error::TaskerResult;

/// Builds the worker pool a job dispatches its shard items onto
pub trait ExecutorServiceHandler: Send + Sync + fmt::Debug {
    /// Identifier this implementation is registered under
    fn name(&self) -> &str;

    /// Create the pool for `job_name`. Sizing is entirely up to the implementation.
    fn create_executor_service(&self, job_name: &str) -> TaskerResult<WorkerPool>;
}

/// Handles a job failure and renders it as the message stored for the shard item
pub trait JobExceptionHandler: Send + Sync + fmt::Debug {
    /// Identifier this implementation is registered under
    fn name(&self) -> &str;

    fn handle_exception(&self, job_name: &str, cause: &anyhow::Error) -> String;
}

/// Pool sized at twice the available parallelism
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExecutorServiceHandler;

impl ExecutorServiceHandler for DefaultExecutorServiceHandler {
    fn name(&self) -> &str {
        handlers::DEFAULT_EXECUTOR_SERVICE_HANDLER
    }

    fn create_executor_service(&self, job_name: &str) -> TaskerResult<WorkerPool> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let workers = cpus * DEFAULT_WORKERS_PER_CPU;
        info!(
            job_name = %job_name,
            cpus = cpus,
            workers = workers,
            "🔧 HANDLER: Creating default executor service"
        );
        WorkerPool::new(job_name, workers)
    }
}

/// Pool with a single worker, shard items run one after another
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleThreadExecutorServiceHandler;

impl ExecutorServiceHandler for SingleThreadExecutorServiceHandler {
    fn name(&self) -> &str {
        handlers::SINGLE_THREAD_EXECUTOR_SERVICE_HANDLER
    }

    fn create_executor_service(&self, job_name: &str) -> TaskerResult<WorkerPool> {
        WorkerPool::new(job_name, 1)
    }
}

/// Logs the failure at error level
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultJobExceptionHandler;

impl JobExceptionHandler for DefaultJobExceptionHandler {
    fn name(&self) -> &str {
        handlers::DEFAULT_JOB_EXCEPTION_HANDLER
    }

    fn handle_exception(&self, job_name: &str, cause: &anyhow::Error) -> String {
        let message = format!("{cause:#}");
        error!(
            job_name = %job_name,
            error = %message,
            "❌ JOB: Job execution failed"
        );
        message
    }
}

/// Keeps the failure message but only logs at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreJobExceptionHandler;

impl JobExceptionHandler for IgnoreJobExceptionHandler {
    fn name(&self) -> &str {
        handlers::IGNORE_JOB_EXCEPTION_HANDLER
    }

    fn handle_exception(&self, job_name: &str, cause: &anyhow::Error) -> String {
        let message = format!("{cause:#}");
        debug!(job_name = %job_name, error = %message, "Ignoring job failure");
        message
    }
}
