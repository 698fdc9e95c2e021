//! # Constants
//!
//! Identifiers of the built-in implementations and the fixed messages posted
//! in job trace events.

/// Identifiers the handler catalog knows without any registration
pub mod handlers {
    pub const DEFAULT_EXECUTOR_SERVICE_HANDLER: &str = "DefaultExecutorServiceHandler";
    pub const SINGLE_THREAD_EXECUTOR_SERVICE_HANDLER: &str = "SingleThreadExecutorServiceHandler";
    pub const DEFAULT_JOB_EXCEPTION_HANDLER: &str = "DefaultJobExceptionHandler";
    pub const IGNORE_JOB_EXCEPTION_HANDLER: &str = "IgnoreJobExceptionHandler";
}

/// Identifier of the processor bound when no custom processor is configured
pub const COMMON_STORAGE_EVENT_PROCESSOR: &str = "CommonStorageEventProcessor";

/// Multiplier applied to available parallelism by the default executor service handler
pub const DEFAULT_WORKERS_PER_CPU: usize = 2;

/// Trace event messages
pub mod messages {
    pub fn execute_begin(job_name: &str) -> String {
        format!("Job '{job_name}' execute begin.")
    }

    pub fn previous_still_running(job_name: &str, items: &[u32]) -> String {
        format!(
            "Previous job '{job_name}' - shardingItems '{items:?}' is still running, misfired job will start after previous job completed."
        )
    }

    pub fn sharding_items_empty(job_name: &str) -> String {
        format!("Sharding item for job '{job_name}' is empty.")
    }
}
