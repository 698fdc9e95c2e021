//! # Job Event Listeners
//!
//! Binds a storage handle to an event processor and exposes the pair as a
//! [`JobEventListener`].
//!
//! Unlike handler resolution, binding never falls back: a processor that was
//! explicitly configured but cannot be built aborts job startup with a
//! configuration error.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::processor::{CommonStorageEventProcessor, EventProcessorCatalog, JobEventProcessor};
use super::storage::{EventStorage, MemoryEventStorage};
use super::types::JobExecutionEvent;
use crate::config::EventTraceConfig;
use crate::error::{TaskerError, TaskerResult};

#[async_trait]
pub trait JobEventListener: Send + Sync + fmt::Debug {
    /// Identity used when logging dispatch failures
    fn identity(&self) -> &str;

    /// Deliver one event. Runs inline on the caller's task; failures are the
    /// listener's to report, never the caller's.
    async fn trigger(&self, event: &JobExecutionEvent);
}

/// Listener forwarding every event to exactly one processor
#[derive(Debug, Clone)]
pub struct StorageEventListener {
    processor: Arc<dyn JobEventProcessor>,
}

impl StorageEventListener {
    pub fn new(processor: Arc<dyn JobEventProcessor>) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &Arc<dyn JobEventProcessor> {
        &self.processor
    }
}

#[async_trait]
impl JobEventListener for StorageEventListener {
    fn identity(&self) -> &str {
        self.processor.name()
    }

    async fn trigger(&self, event: &JobExecutionEvent) {
        if let Err(e) = self.processor.add_job_execution_event(event).await {
            warn!(
                processor = %self.processor.name(),
                event_id = %event.id,
                job_name = %event.job_name,
                error = %e,
                "⚠️ EVENTS: Processor failed to persist job execution event"
            );
        }
    }
}

/// Builds [`StorageEventListener`]s from a storage handle and a processor identifier
#[derive(Debug, Clone, Default)]
pub struct EventProcessorBinder {
    catalog: Arc<EventProcessorCatalog>,
}

impl EventProcessorBinder {
    pub fn new(catalog: Arc<EventProcessorCatalog>) -> Self {
        Self { catalog }
    }

    /// Bind `storage` to the processor named by `processor_identifier`, or to
    /// [`CommonStorageEventProcessor`] when the identifier is empty.
    pub fn build(
        &self,
        storage: Arc<dyn EventStorage>,
        processor_identifier: &str,
    ) -> TaskerResult<StorageEventListener> {
        let identifier = processor_identifier.trim();
        if identifier.is_empty() {
            return Ok(StorageEventListener::new(Arc::new(
                CommonStorageEventProcessor::new(storage),
            )));
        }

        let storage_type = storage.storage_type();
        let processor = self.catalog.instantiate(identifier, storage).map_err(|cause| {
            error!(
                processor = %identifier,
                storage = %storage_type,
                error = %cause,
                "❌ EVENTS: Cannot bind custom event processor"
            );
            TaskerError::ConfigurationError(format!(
                "Cannot create job event listener with processor '{identifier}': {cause}"
            ))
        })?;

        info!(
            processor = %processor.name(),
            storage = %storage_type,
            "✅ EVENTS: Bound custom event processor"
        );
        Ok(StorageEventListener::new(processor))
    }
}

/// Event trace settings of a job: where events go and which processor writes them
#[derive(Debug, Clone)]
pub struct EventTraceConfiguration {
    storage: Arc<dyn EventStorage>,
    processor: String,
}

impl EventTraceConfiguration {
    pub fn new(storage: Arc<dyn EventStorage>, processor: impl Into<String>) -> Self {
        Self {
            storage,
            processor: processor.into(),
        }
    }

    /// Build from the `event_trace` section of the jobs configuration.
    ///
    /// `None` when tracing is disabled. A `database_url` selects PostgreSQL
    /// storage, otherwise events are kept in memory.
    pub fn from_config(config: &EventTraceConfig) -> TaskerResult<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let storage: Arc<dyn EventStorage> = match config.database_url.as_deref() {
            None => Arc::new(MemoryEventStorage::new()),
            #[cfg(feature = "postgres")]
            Some(url) => Arc::new(super::storage::PgEventStorage::connect_lazy(url)?),
            #[cfg(not(feature = "postgres"))]
            Some(_) => {
                return Err(TaskerError::ConfigurationError(
                    "event_trace.database_url requires the postgres feature".to_string(),
                ))
            }
        };
        Ok(Some(Self::new(storage, config.processor.clone())))
    }

    pub fn storage(&self) -> &Arc<dyn EventStorage> {
        &self.storage
    }

    pub fn processor(&self) -> &str {
        &self.processor
    }

    pub fn create_job_event_listener(
        &self,
        binder: &EventProcessorBinder,
    ) -> TaskerResult<Arc<dyn JobEventListener>> {
        let listener = binder.build(Arc::clone(&self.storage), &self.processor)?;
        Ok(Arc::new(listener))
    }
}
