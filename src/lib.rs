#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Jobs
//!
//! Execution core for sharded jobs.
//!
//! ## Overview
//!
//! A job is split into shard items which run concurrently on a job-scoped
//! worker pool. This crate owns everything between "the coordination layer says
//! this instance owns items 0 and 2" and "the business logic ran for items 0 and
//! 2 and here is what failed":
//!
//! - resolving the configured executor service handler and job exception
//!   handler by name, falling back to the built-in defaults
//! - keeping exactly one worker pool per job name
//! - binding job event listeners to an event processor and its storage
//! - running rounds (normal, misfired) and aggregating per-item failures
//!
//! ## Module Organization
//!
//! - [`registry`] - Handler catalog, resolver and the per-job pool registry
//! - [`executor`] - Job executor, sharding contexts and built-in handlers
//! - [`events`] - Job execution events, processors, listeners and the event bus
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasker_jobs::config::ConfigManager;
//! use tasker_jobs::registry::{ExecutorServiceRegistry, HandlerResolver};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! tasker_jobs::logging::init_structured_logging();
//!
//! let manager = ConfigManager::load_from_file("config/jobs.yaml")?;
//! let resolver = HandlerResolver::default();
//! let pools = Arc::new(ExecutorServiceRegistry::new());
//!
//! for job in &manager.config().jobs {
//!     let handler = resolver.resolve_executor_service_handler(&job.job_properties)?;
//!     let pool = pools.get_or_create(&job.job_name, handler.as_ref())?;
//!     println!("{} runs on {} workers", job.job_name, pool.max_workers());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib                       # Unit tests
//! cargo test                             # All tests
//! cargo bench --features benchmarks      # Resolution benchmarks
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod executor;
pub mod logging;
pub mod registry;

pub use config::{ConfigManager, EventTraceConfig, JobConfiguration, JobsConfig};
pub use error::{ResolutionError, TaskerError, TaskerResult};
pub use events::{
    EventProcessorBinder, EventProcessorCatalog, EventTraceConfiguration, ExecutionSource,
    JobEventBus, JobEventListener, JobEventProcessor, JobEventState, JobExecutionEvent,
};
pub use executor::{
    ExecutionReport, ExecutorServiceHandler, JobExceptionHandler, JobExecutor, JobFacade,
    RoundErrorMap, RoundOutcome, ShardingContext, ShardingContexts, ShardingJob, WorkerPool,
};
pub use registry::{
    CapabilityDescriptor, CapabilityKind, ExecutorServiceRegistry, HandlerCatalog,
    HandlerInstance, HandlerResolver, JobProperties, JobPropertyKey,
};
