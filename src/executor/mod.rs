//! # Job Execution
//!
//! Everything needed to run a sharded job once its handlers are resolved.
//!
//! ## Core Components
//!
//! - **JobExecutor**: orchestrates rounds and aggregates per-item failures
//! - **ShardingJob**: the per-item hook a concrete job implements
//! - **JobFacade**: boundary to the coordination layer
//! - **ExecutorServiceHandler / JobExceptionHandler**: the configurable capabilities
//! - **WorkerPool**: bounded job-scoped executor shard items run on

pub mod facade;
pub mod handlers;
pub mod job;
pub mod job_executor;
pub mod types;
pub mod worker_pool;

pub use facade::JobFacade;
pub use handlers::{
    DefaultExecutorServiceHandler, DefaultJobExceptionHandler, ExecutorServiceHandler,
    IgnoreJobExceptionHandler, JobExceptionHandler, SingleThreadExecutorServiceHandler,
};
pub use job::ShardingJob;
pub use job_executor::JobExecutor;
pub use types::{ExecutionReport, RoundErrorMap, RoundOutcome, ShardingContext, ShardingContexts};
pub use worker_pool::WorkerPool;
