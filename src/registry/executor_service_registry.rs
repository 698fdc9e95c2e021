//! # Executor Service Registry
//!
//! Per-job cache of worker pools. The first `get_or_create` for a job name
//! builds the pool through the job's executor service handler; every later or
//! concurrent call for that name receives the same `Arc<WorkerPool>`. Entries
//! live until [`ExecutorServiceRegistry::remove`] is called at job teardown.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::TaskerResult;
use crate::executor::handlers::ExecutorServiceHandler;
use crate::executor::worker_pool::WorkerPool;
use crate::logging::{log_error, log_registry_operation};

#[derive(Debug, Default)]
pub struct ExecutorServiceRegistry {
    pools: DashMap<String, Arc<WorkerPool>>,
}

impl ExecutorServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the job's pool, creating it through `handler` if none exists yet.
    ///
    /// Creation runs while the entry's shard is locked, so racing callers for
    /// the same name wait for the winner instead of building their own pool.
    /// A creation failure leaves no entry behind.
    pub fn get_or_create(
        &self,
        job_name: &str,
        handler: &dyn ExecutorServiceHandler,
    ) -> TaskerResult<Arc<WorkerPool>> {
        match self.pools.entry(job_name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let pool = handler.create_executor_service(job_name).map_err(|e| {
                    log_error(
                        "executor_service_registry",
                        "get_or_create",
                        &e.to_string(),
                        Some(job_name),
                    );
                    e
                })?;
                let pool = Arc::new(pool);
                entry.insert(Arc::clone(&pool));
                log_registry_operation(
                    "register",
                    "executor_service",
                    Some(job_name),
                    "created",
                    Some(handler.name()),
                );
                Ok(pool)
            }
        }
    }

    pub fn get(&self, job_name: &str) -> Option<Arc<WorkerPool>> {
        self.pools.get(job_name).map(|pool| Arc::clone(pool.value()))
    }

    /// Drop the job's entry and shut its pool down
    pub fn remove(&self, job_name: &str) -> Option<Arc<WorkerPool>> {
        let (_, pool) = self.pools.remove(job_name)?;
        pool.shutdown();
        info!(job_name = %job_name, "📚 REGISTRY: Removed worker pool");
        Some(pool)
    }

    pub fn contains(&self, job_name: &str) -> bool {
        self.pools.contains_key(job_name)
    }

    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pools.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Shut down and drop every pool
    pub fn clear(&self) {
        for name in self.job_names() {
            self.remove(&name);
        }
    }
}
