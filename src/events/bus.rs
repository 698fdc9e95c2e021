//! # Job Event Bus
//!
//! Fans every job execution event out to the configured listeners, one after
//! another, in registration order.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tasker_jobs::events::{
//!     EventProcessorBinder, EventTraceConfiguration, ExecutionSource, JobEventBus,
//!     JobEventState, JobExecutionEvent, MemoryEventStorage,
//! };
//!
//! # tokio_test::block_on(async {
//! let storage = Arc::new(MemoryEventStorage::new());
//! let bus = JobEventBus::from_configurations(
//!     &[EventTraceConfiguration::new(storage.clone(), "")],
//!     &EventProcessorBinder::default(),
//! )
//! .unwrap();
//!
//! let event = JobExecutionEvent::new(
//!     "settlement@-@1",
//!     "settlement",
//!     ExecutionSource::NormalTrigger,
//!     JobEventState::Staging,
//!     "Job 'settlement' execute begin.",
//! );
//! bus.post(&event).await;
//! assert_eq!(storage.len(), 1);
//! # });
//! ```

use std::sync::Arc;
use tracing::debug;

use super::listener::{EventProcessorBinder, EventTraceConfiguration, JobEventListener};
use super::types::JobExecutionEvent;
use crate::error::TaskerResult;

/// Fans one job event out to every configured listener, in registration order
#[derive(Debug, Clone, Default)]
pub struct JobEventBus {
    listeners: Vec<Arc<dyn JobEventListener>>,
}

impl JobEventBus {
    pub fn new(listeners: Vec<Arc<dyn JobEventListener>>) -> Self {
        Self { listeners }
    }

    /// Build one listener per configuration. Any binding failure is returned.
    pub fn from_configurations(
        configurations: &[EventTraceConfiguration],
        binder: &EventProcessorBinder,
    ) -> TaskerResult<Self> {
        let listeners = configurations
            .iter()
            .map(|config| config.create_job_event_listener(binder))
            .collect::<TaskerResult<Vec<_>>>()?;
        Ok(Self::new(listeners))
    }

    pub fn register(&mut self, listener: Arc<dyn JobEventListener>) {
        self.listeners.push(listener);
    }

    /// False when there is nobody to deliver to
    pub fn is_enabled(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub async fn post(&self, event: &JobExecutionEvent) {
        debug!(
            event_id = %event.id,
            state = %event.state,
            listeners = self.listeners.len(),
            "Posting job event"
        );
        for listener in &self.listeners {
            listener.trigger(event).await;
        }
    }
}
