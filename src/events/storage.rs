//! # Event Storage
//!
//! The storage handle event processors are constructed from. A processor
//! registered for a concrete storage type can only be bound to a handle of that
//! type, which [`EventStorage::as_any`] makes checkable at bind time.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::types::JobExecutionEvent;
use crate::error::TaskerResult;

#[async_trait]
pub trait EventStorage: Send + Sync + fmt::Debug + 'static {
    /// Short name of the backend, used in error messages
    fn storage_type(&self) -> &'static str;

    async fn insert_job_execution_event(&self, event: &JobExecutionEvent) -> TaskerResult<()>;

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Keeps events in memory. Used for embedded deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryEventStorage {
    events: Mutex<Vec<JobExecutionEvent>>,
}

impl MemoryEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored event, in insertion order
    pub fn events(&self) -> Vec<JobExecutionEvent> {
        self.events.lock().clone()
    }

    pub fn events_for_task(&self, task_id: &str) -> Vec<JobExecutionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[async_trait]
impl EventStorage for MemoryEventStorage {
    fn storage_type(&self) -> &'static str {
        "memory"
    }

    async fn insert_job_execution_event(&self, event: &JobExecutionEvent) -> TaskerResult<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(feature = "postgres")]
pub use pg::PgEventStorage;

#[cfg(feature = "postgres")]
mod pg {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::PgPool;
    use tracing::debug;

    /// Writes events to the `job_execution_log` table. The table itself is
    /// managed outside this crate. The completion record of a shard item
    /// updates the row its start record created.
    #[derive(Debug, Clone)]
    pub struct PgEventStorage {
        pool: PgPool,
    }

    impl PgEventStorage {
        pub fn new(pool: PgPool) -> Self {
            Self { pool }
        }

        /// Build a storage whose pool connects on first use
        pub fn connect_lazy(database_url: &str) -> TaskerResult<Self> {
            let pool = PgPoolOptions::new().connect_lazy(database_url)?;
            Ok(Self { pool })
        }

        pub fn pool(&self) -> &PgPool {
            &self.pool
        }
    }

    #[async_trait]
    impl EventStorage for PgEventStorage {
        fn storage_type(&self) -> &'static str {
            "postgres"
        }

        async fn insert_job_execution_event(&self, event: &JobExecutionEvent) -> TaskerResult<()> {
            let sharding_items = serde_json::to_value(&event.sharding_items)?;
            sqlx::query(
                r#"
                INSERT INTO job_execution_log
                    (id, task_id, job_name, execution_source, state, message, sharding_items,
                     creation_time, sharding_item, success, failure_cause, complete_time)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (id) DO UPDATE SET
                    state = EXCLUDED.state,
                    message = EXCLUDED.message,
                    success = EXCLUDED.success,
                    failure_cause = EXCLUDED.failure_cause,
                    complete_time = EXCLUDED.complete_time
                "#,
            )
            .bind(event.id)
            .bind(&event.task_id)
            .bind(&event.job_name)
            .bind(event.execution_source.as_str())
            .bind(event.state.as_str())
            .bind(&event.message)
            .bind(sharding_items)
            .bind(event.creation_time)
            .bind(event.sharding_item.map(i64::from))
            .bind(event.success)
            .bind(&event.failure_cause)
            .bind(event.complete_time)
            .execute(&self.pool)
            .await?;

            debug!(event_id = %event.id, task_id = %event.task_id, "💾 STORAGE: Event persisted");
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }
}
