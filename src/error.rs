//! Error types for the job execution core.
//!

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskerError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Job system error: {0}")]
    JobSystemError(String),
    #[error("Coordination error: {0}")]
    CoordinationError(String),
    #[error("Worker pool error: {0}")]
    WorkerPoolError(String),
    #[error("Event error: {0}")]
    EventError(String),
}

impl From<serde_json::Error> for TaskerError {
    fn from(error: serde_json::Error) -> Self {
        TaskerError::EventError(format!("JSON serialization error: {error}"))
    }
}

impl From<crate::config::ConfigurationError> for TaskerError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        TaskerError::ConfigurationError(error.to_string())
    }
}

impl From<ResolutionError> for TaskerError {
    fn from(error: ResolutionError) -> Self {
        TaskerError::ConfigurationError(error.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for TaskerError {
    fn from(err: sqlx::Error) -> Self {
        TaskerError::EventError(format!("Database error: {err}"))
    }
}

pub type TaskerResult<T> = std::result::Result<T, TaskerError>;

/// Why a configured implementation identifier could not be turned into an instance.
///
/// Handler resolution treats every variant the same way (fall back to the
/// default); event processor binding turns every variant into a fatal
/// configuration error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// Nothing is registered under this identifier
    #[error("no implementation registered for identifier '{identifier}'")]
    UnknownIdentifier { identifier: String },

    /// The identifier resolves, but to a different capability than requested
    #[error("'{identifier}' provides {actual}, expected {expected}")]
    CapabilityMismatch {
        identifier: String,
        expected: String,
        actual: String,
    },

    /// The factory ran and failed
    #[error("failed to construct '{identifier}': {reason}")]
    ConstructionFailed { identifier: String, reason: String },

    /// The processor has no constructor for the supplied storage handle type
    #[error("'{identifier}' has no constructor accepting storage '{actual}' (expects {expected})")]
    StorageMismatch {
        identifier: String,
        expected: String,
        actual: String,
    },
}

impl ResolutionError {
    pub fn unknown<I: Into<String>>(identifier: I) -> Self {
        Self::UnknownIdentifier {
            identifier: identifier.into(),
        }
    }

    pub fn construction_failed<I: Into<String>, E: std::fmt::Display>(
        identifier: I,
        reason: E,
    ) -> Self {
        Self::ConstructionFailed {
            identifier: identifier.into(),
            reason: reason.to_string(),
        }
    }

    /// Identifier the failure refers to
    pub fn identifier(&self) -> &str {
        match self {
            Self::UnknownIdentifier { identifier }
            | Self::CapabilityMismatch { identifier, .. }
            | Self::ConstructionFailed { identifier, .. }
            | Self::StorageMismatch { identifier, .. } => identifier,
        }
    }
}
