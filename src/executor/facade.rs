//! # Job Facade
//!
//! Boundary to the coordination layer. Shard assignment, running/misfire
//! bookkeeping, failover and trace event delivery all live on the other side of
//! this trait; the executor only calls into it.

use async_trait::async_trait;

use super::types::ShardingContexts;
use crate::config::JobConfiguration;
use crate::error::TaskerResult;
use crate::events::JobExecutionEvent;

#[async_trait]
pub trait JobFacade: Send + Sync {
    /// Job definition for the executor being constructed
    async fn load_job_configuration(&self) -> TaskerResult<JobConfiguration>;

    /// Shard items assigned to this instance for the current trigger
    async fn sharding_contexts(&self) -> TaskerResult<ShardingContexts>;

    /// Marks `items` misfired and returns true when a previous execution still runs them
    async fn misfire_if_running(&self, items: &[u32]) -> TaskerResult<bool>;

    /// Deliver a trace event. Delivery problems stay on the facade's side.
    async fn post_trace_event(&self, event: JobExecutionEvent);

    /// Fails when this instance must not execute (e.g. clock skew)
    async fn check_job_execution_environment(&self) -> TaskerResult<()> {
        Ok(())
    }

    async fn clean_previous_execution_info(&self) -> TaskerResult<()> {
        Ok(())
    }

    /// User-level hook before the first round; failures go to the exception handler
    async fn before_job_executed(&self, contexts: &ShardingContexts) -> anyhow::Result<()> {
        let _ = contexts;
        Ok(())
    }

    /// User-level hook after the last round; failures go to the exception handler
    async fn after_job_executed(&self, contexts: &ShardingContexts) -> anyhow::Result<()> {
        let _ = contexts;
        Ok(())
    }

    async fn register_job_begin(&self, contexts: &ShardingContexts) -> TaskerResult<()> {
        let _ = contexts;
        Ok(())
    }

    async fn register_job_completed(&self, contexts: &ShardingContexts) -> TaskerResult<()> {
        let _ = contexts;
        Ok(())
    }

    /// Items among `items` that misfired while the last round was running
    async fn misfired_items(&self, items: &[u32]) -> TaskerResult<Vec<u32>> {
        let _ = items;
        Ok(Vec::new())
    }

    async fn clear_misfire(&self, items: &[u32]) -> TaskerResult<()> {
        let _ = items;
        Ok(())
    }

    async fn failover_if_necessary(&self) -> TaskerResult<()> {
        Ok(())
    }
}
