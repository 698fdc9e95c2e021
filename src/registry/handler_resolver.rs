//! # Handler Resolver
//!
//! Turns a configured implementation identifier into a validated handler.
//!
//! ```text
//! configured identifier ──blank──────────────────────────┐
//!        │                                               ▼
//!        ├─ unknown / wrong capability / failed ──warn──► default identifier
//!        │                                               │
//!        ▼                                               ├─ ok ──► instance
//!     instance                                           └─ err ─► ConfigurationError
//! ```
//!
//! A job resolves each capability once, at construction, and keeps the result
//! for its lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::capability::{CapabilityDescriptor, JobProperties, JobPropertyKey};
use super::handler_catalog::{HandlerCatalog, HandlerInstance};
use crate::error::{ResolutionError, TaskerError, TaskerResult};
use crate::executor::handlers::{ExecutorServiceHandler, JobExceptionHandler};

/// Resolves handler identifiers against a [`HandlerCatalog`]
#[derive(Debug)]
pub struct HandlerResolver {
    catalog: Arc<HandlerCatalog>,
    /// Number of times a configured identifier was replaced by the default
    fallbacks: AtomicU64,
}

impl HandlerResolver {
    pub fn new(catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            catalog,
            fallbacks: AtomicU64::new(0),
        }
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// Resolve `configured_identifier` for `descriptor`, falling back to the
    /// descriptor's default when the configured implementation cannot be used.
    ///
    /// Fails only when the default itself cannot be instantiated.
    pub fn resolve(
        &self,
        descriptor: &CapabilityDescriptor,
        configured_identifier: &str,
    ) -> TaskerResult<HandlerInstance> {
        let identifier = configured_identifier.trim();
        if identifier.is_empty() {
            debug!(
                key = %descriptor.key,
                default = %descriptor.default_identifier,
                "No handler configured, resolving default"
            );
            return self.resolve_default(descriptor);
        }

        match self.instantiate_checked(descriptor, identifier) {
            Ok(instance) => {
                debug!(key = %descriptor.key, identifier = %identifier, "✅ RESOLVER: Handler resolved");
                Ok(instance)
            }
            Err(cause) => {
                warn!(
                    identifier = %identifier,
                    key = %descriptor.key,
                    default = %descriptor.default_identifier,
                    error = %cause,
                    "⚠️ RESOLVER: Cannot instantiate configured handler, using default"
                );
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.resolve_default(descriptor)
            }
        }
    }

    /// Resolve the executor service handler configured in `properties`
    pub fn resolve_executor_service_handler(
        &self,
        properties: &JobProperties,
    ) -> TaskerResult<Arc<dyn ExecutorServiceHandler>> {
        let key = JobPropertyKey::ExecutorServiceHandler;
        self.resolve(key.descriptor(), properties.get(key))?
            .into_executor_service()
            .ok_or_else(|| {
                TaskerError::JobSystemError(format!("Resolved handler for '{key}' has wrong capability"))
            })
    }

    /// Resolve the job exception handler configured in `properties`
    pub fn resolve_job_exception_handler(
        &self,
        properties: &JobProperties,
    ) -> TaskerResult<Arc<dyn JobExceptionHandler>> {
        let key = JobPropertyKey::JobExceptionHandler;
        self.resolve(key.descriptor(), properties.get(key))?
            .into_job_exception()
            .ok_or_else(|| {
                TaskerError::JobSystemError(format!("Resolved handler for '{key}' has wrong capability"))
            })
    }

    /// Number of fallbacks to a default so far
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn resolve_default(&self, descriptor: &CapabilityDescriptor) -> TaskerResult<HandlerInstance> {
        self.instantiate_checked(descriptor, descriptor.default_identifier)
            .map_err(|cause| {
                error!(
                    key = %descriptor.key,
                    default = %descriptor.default_identifier,
                    error = %cause,
                    "❌ RESOLVER: Default handler cannot be instantiated"
                );
                TaskerError::ConfigurationError(format!(
                    "Cannot instantiate default handler '{}' for '{}': {cause}",
                    descriptor.default_identifier, descriptor.key
                ))
            })
    }

    fn instantiate_checked(
        &self,
        descriptor: &CapabilityDescriptor,
        identifier: &str,
    ) -> Result<HandlerInstance, ResolutionError> {
        let instance = self.catalog.instantiate(identifier)?;
        if instance.capability() != descriptor.capability {
            return Err(ResolutionError::CapabilityMismatch {
                identifier: identifier.to_string(),
                expected: descriptor.capability.to_string(),
                actual: instance.capability().to_string(),
            });
        }
        Ok(instance)
    }
}

impl Default for HandlerResolver {
    fn default() -> Self {
        Self::new(Arc::new(HandlerCatalog::with_builtins()))
    }
}
