//! # Registry Infrastructure
//!
//! Lookup tables that turn job configuration into running components.
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── capability                (Property key → capability + default identifier)
//! ├── HandlerCatalog            (Identifier → handler factory)
//! ├── HandlerResolver           (Configured identifier → handler, with fallback)
//! └── ExecutorServiceRegistry   (Job name → shared worker pool)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tasker_jobs::registry::{
//!     ExecutorServiceRegistry, HandlerCatalog, HandlerResolver, JobProperties,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = HandlerResolver::new(Arc::new(HandlerCatalog::with_builtins()));
//! let pools = ExecutorServiceRegistry::new();
//!
//! let properties = JobProperties::new();
//! let handler = resolver.resolve_executor_service_handler(&properties)?;
//! let pool = pools.get_or_create("daily_settlement", handler.as_ref())?;
//! assert_eq!(pool.name(), "daily_settlement");
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod executor_service_registry;
pub mod handler_catalog;
pub mod handler_resolver;

pub use capability::{
    CapabilityDescriptor, CapabilityKind, JobProperties, JobPropertyKey, CAPABILITY_DESCRIPTORS,
};
pub use executor_service_registry::ExecutorServiceRegistry;
pub use handler_catalog::{HandlerCatalog, HandlerFactory, HandlerInstance};
pub use handler_resolver::HandlerResolver;
