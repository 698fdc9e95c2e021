//! # Job Event Processors
//!
//! A processor receives every execution event a listener is triggered with and
//! is responsible for persisting it. The built-in
//! [`CommonStorageEventProcessor`] writes straight into its storage handle;
//! custom processors are registered in an [`EventProcessorCatalog`] together
//! with a constructor taking the storage handle type they work with.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::storage::EventStorage;
use super::types::JobExecutionEvent;
use crate::constants::COMMON_STORAGE_EVENT_PROCESSOR;
use crate::error::{ResolutionError, TaskerResult};

#[async_trait]
pub trait JobEventProcessor: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn add_job_execution_event(&self, event: &JobExecutionEvent) -> TaskerResult<()>;
}

/// Default processor: every event goes to the storage handle unchanged
#[derive(Debug, Clone)]
pub struct CommonStorageEventProcessor {
    storage: Arc<dyn EventStorage>,
}

impl CommonStorageEventProcessor {
    pub fn new(storage: Arc<dyn EventStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn EventStorage> {
        &self.storage
    }
}

#[async_trait]
impl JobEventProcessor for CommonStorageEventProcessor {
    fn name(&self) -> &str {
        COMMON_STORAGE_EVENT_PROCESSOR
    }

    async fn add_job_execution_event(&self, event: &JobExecutionEvent) -> TaskerResult<()> {
        debug!(
            event_id = %event.id,
            job_name = %event.job_name,
            state = %event.state,
            storage = %self.storage.storage_type(),
            "Persisting job execution event"
        );
        self.storage.insert_job_execution_event(event).await
    }
}

/// Constructor taking a storage handle
pub type ProcessorFactory = Arc<
    dyn Fn(Arc<dyn EventStorage>) -> Result<Arc<dyn JobEventProcessor>, ResolutionError>
        + Send
        + Sync,
>;

/// Identifier → processor constructor table
#[derive(Clone, Default)]
pub struct EventProcessorCatalog {
    factories: HashMap<String, ProcessorFactory>,
}

impl EventProcessorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processor whose constructor needs the concrete storage type `S`.
    ///
    /// Binding it to any other storage type fails with
    /// [`ResolutionError::StorageMismatch`].
    pub fn register<S, P, F>(&mut self, identifier: impl Into<String>, constructor: F)
    where
        S: EventStorage,
        P: JobEventProcessor + 'static,
        F: Fn(Arc<S>) -> TaskerResult<P> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        let id = identifier.clone();
        let factory: ProcessorFactory = Arc::new(move |storage: Arc<dyn EventStorage>| {
            let actual = storage.storage_type();
            let typed = storage.as_any().downcast::<S>().map_err(|_| {
                ResolutionError::StorageMismatch {
                    identifier: id.clone(),
                    expected: std::any::type_name::<S>().to_string(),
                    actual: actual.to_string(),
                }
            })?;
            let processor = constructor(typed)
                .map_err(|e| ResolutionError::construction_failed(id.clone(), e))?;
            Ok(Arc::new(processor) as Arc<dyn JobEventProcessor>)
        });
        debug!(identifier = %identifier, "📚 CATALOG: Registering event processor");
        self.factories.insert(identifier, factory);
    }

    /// Register a processor that accepts any storage handle
    pub fn register_for_any_storage<P, F>(&mut self, identifier: impl Into<String>, constructor: F)
    where
        P: JobEventProcessor + 'static,
        F: Fn(Arc<dyn EventStorage>) -> TaskerResult<P> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        let id = identifier.clone();
        let factory: ProcessorFactory = Arc::new(move |storage: Arc<dyn EventStorage>| {
            let processor = constructor(storage)
                .map_err(|e| ResolutionError::construction_failed(id.clone(), e))?;
            Ok(Arc::new(processor) as Arc<dyn JobEventProcessor>)
        });
        debug!(identifier = %identifier, "📚 CATALOG: Registering event processor");
        self.factories.insert(identifier, factory);
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier.trim())
    }

    pub fn identifiers(&self) -> Vec<&str> {
        let mut identifiers: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        identifiers.sort_unstable();
        identifiers
    }

    /// Construct the processor registered under `identifier` from `storage`
    pub fn instantiate(
        &self,
        identifier: &str,
        storage: Arc<dyn EventStorage>,
    ) -> Result<Arc<dyn JobEventProcessor>, ResolutionError> {
        let identifier = identifier.trim();
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| ResolutionError::unknown(identifier))?;
        factory(storage)
    }
}

// Manual Debug implementation because factories are closures
impl fmt::Debug for EventProcessorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProcessorCatalog")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
