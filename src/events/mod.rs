//! # Job Event Tracing
//!
//! Trace events describe the lifecycle of a job round (staging, running,
//! finished, error). They flow from the job executor through the coordination
//! facade into a [`JobEventBus`], whose listeners hand them to a
//! [`JobEventProcessor`] bound to an [`EventStorage`].
//!
//! ```text
//! JobExecutor ─► JobFacade::post_trace_event ─► JobEventBus
//!                                                  └─► StorageEventListener ─► JobEventProcessor ─► EventStorage
//! ```

pub mod bus;
pub mod listener;
pub mod processor;
pub mod storage;
pub mod types;

pub use bus::JobEventBus;
pub use listener::{
    EventProcessorBinder, EventTraceConfiguration, JobEventListener, StorageEventListener,
};
pub use processor::{
    CommonStorageEventProcessor, EventProcessorCatalog, JobEventProcessor, ProcessorFactory,
};
#[cfg(feature = "postgres")]
pub use storage::PgEventStorage;
pub use storage::{EventStorage, MemoryEventStorage};
pub use types::{ExecutionSource, JobEventState, JobExecutionEvent};
