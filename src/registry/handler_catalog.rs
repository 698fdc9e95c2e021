//! # Handler Catalog
//!
//! Maps implementation identifiers (the strings found in job properties) to
//! factory functions. Anything a job may name must be registered here up front.
//! Factories report failure through a [`ResolutionError`].
//!
//! ## Usage
//!
//! ```rust
//! use tasker_jobs::registry::HandlerCatalog;
//! use tasker_jobs::executor::{JobExceptionHandler};
//!
//! #[derive(Debug, Default)]
//! struct PagerExceptionHandler;
//!
//! impl JobExceptionHandler for PagerExceptionHandler {
//!     fn name(&self) -> &str { "PagerExceptionHandler" }
//!     fn handle_exception(&self, _job: &str, cause: &anyhow::Error) -> String {
//!         cause.to_string()
//!     }
//! }
//!
//! let mut catalog = HandlerCatalog::with_builtins();
//! catalog.register_job_exception_handler::<PagerExceptionHandler>("PagerExceptionHandler");
//! assert!(catalog.contains("PagerExceptionHandler"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

use super::capability::CapabilityKind;
use crate::constants::handlers;
use crate::error::ResolutionError;
use crate::executor::handlers::{
    DefaultExecutorServiceHandler, DefaultJobExceptionHandler, ExecutorServiceHandler,
    IgnoreJobExceptionHandler, JobExceptionHandler, SingleThreadExecutorServiceHandler,
};

/// A resolved handler, tagged with the capability it provides
#[derive(Debug, Clone)]
pub enum HandlerInstance {
    ExecutorService(Arc<dyn ExecutorServiceHandler>),
    JobException(Arc<dyn JobExceptionHandler>),
}

impl HandlerInstance {
    pub fn capability(&self) -> CapabilityKind {
        match self {
            HandlerInstance::ExecutorService(_) => CapabilityKind::ExecutorService,
            HandlerInstance::JobException(_) => CapabilityKind::JobException,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            HandlerInstance::ExecutorService(handler) => handler.name(),
            HandlerInstance::JobException(handler) => handler.name(),
        }
    }

    pub fn into_executor_service(self) -> Option<Arc<dyn ExecutorServiceHandler>> {
        match self {
            HandlerInstance::ExecutorService(handler) => Some(handler),
            HandlerInstance::JobException(_) => None,
        }
    }

    pub fn into_job_exception(self) -> Option<Arc<dyn JobExceptionHandler>> {
        match self {
            HandlerInstance::JobException(handler) => Some(handler),
            HandlerInstance::ExecutorService(_) => None,
        }
    }
}

/// Factory producing a fresh handler instance
pub type HandlerFactory =
    Arc<dyn Fn() -> Result<HandlerInstance, ResolutionError> + Send + Sync>;

/// Identifier → factory table
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    factories: HashMap<String, HandlerFactory>,
}

impl HandlerCatalog {
    /// Catalog without any identifiers, not even the defaults
    pub fn empty() -> Self {
        Self::default()
    }

    /// Catalog with every built-in handler registered
    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        catalog.register_executor_service_handler::<DefaultExecutorServiceHandler>(
            handlers::DEFAULT_EXECUTOR_SERVICE_HANDLER,
        );
        catalog.register_executor_service_handler::<SingleThreadExecutorServiceHandler>(
            handlers::SINGLE_THREAD_EXECUTOR_SERVICE_HANDLER,
        );
        catalog.register_job_exception_handler::<DefaultJobExceptionHandler>(
            handlers::DEFAULT_JOB_EXCEPTION_HANDLER,
        );
        catalog.register_job_exception_handler::<IgnoreJobExceptionHandler>(
            handlers::IGNORE_JOB_EXCEPTION_HANDLER,
        );
        catalog
    }

    /// Register a raw factory. Returns the factory previously registered under
    /// the same identifier, if any.
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F) -> Option<HandlerFactory>
    where
        F: Fn() -> Result<HandlerInstance, ResolutionError> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        debug!(identifier = %identifier, "📚 CATALOG: Registering handler factory");
        self.factories.insert(identifier, Arc::new(factory))
    }

    /// Register an executor service handler built through its no-argument constructor
    pub fn register_executor_service_handler<H>(&mut self, identifier: impl Into<String>)
    where
        H: ExecutorServiceHandler + Default + 'static,
    {
        self.register(identifier, || {
            Ok(HandlerInstance::ExecutorService(Arc::new(H::default())))
        });
    }

    /// Register a job exception handler built through its no-argument constructor
    pub fn register_job_exception_handler<H>(&mut self, identifier: impl Into<String>)
    where
        H: JobExceptionHandler + Default + 'static,
    {
        self.register(identifier, || {
            Ok(HandlerInstance::JobException(Arc::new(H::default())))
        });
    }

    pub fn unregister(&mut self, identifier: &str) -> Option<HandlerFactory> {
        self.factories.remove(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier.trim())
    }

    pub fn identifiers(&self) -> Vec<&str> {
        let mut identifiers: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        identifiers.sort_unstable();
        identifiers
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Build a new instance for `identifier`.
    ///
    /// A factory that panics is reported as [`ResolutionError::ConstructionFailed`].
    pub fn instantiate(&self, identifier: &str) -> Result<HandlerInstance, ResolutionError> {
        let identifier = identifier.trim();
        let factory = self
            .factories
            .get(identifier)
            .ok_or_else(|| ResolutionError::unknown(identifier))?;

        match catch_unwind(AssertUnwindSafe(|| factory())) {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "factory panicked".to_string());
                Err(ResolutionError::construction_failed(identifier, reason))
            }
        }
    }
}

// Manual Debug implementation because factories are closures
impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
