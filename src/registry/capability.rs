//! # Capability Table
//!
//! Static table of the job properties that select a handler implementation.
//! Each entry names the capability the configured implementation must provide
//! and the built-in identifier used when the configured one cannot be used.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::handlers;

/// Kind of behaviour a handler implementation provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    ExecutorService,
    JobException,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::ExecutorService => write!(f, "executor service handler"),
            CapabilityKind::JobException => write!(f, "job exception handler"),
        }
    }
}

/// Job property keys that select a handler implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobPropertyKey {
    ExecutorServiceHandler,
    JobExceptionHandler,
}

impl JobPropertyKey {
    pub const ALL: [JobPropertyKey; 2] = [
        JobPropertyKey::ExecutorServiceHandler,
        JobPropertyKey::JobExceptionHandler,
    ];

    /// Key as it appears in job configuration
    pub fn key(&self) -> &'static str {
        match self {
            JobPropertyKey::ExecutorServiceHandler => "executor_service_handler",
            JobPropertyKey::JobExceptionHandler => "job_exception_handler",
        }
    }

    /// Accepts both the configuration key and the upper-case constant name
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.key() == normalized)
    }

    pub fn descriptor(&self) -> &'static CapabilityDescriptor {
        match self {
            JobPropertyKey::ExecutorServiceHandler => &CAPABILITY_DESCRIPTORS[0],
            JobPropertyKey::JobExceptionHandler => &CAPABILITY_DESCRIPTORS[1],
        }
    }
}

impl fmt::Display for JobPropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One configurable behaviour: which capability it needs and what to use by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    pub key: JobPropertyKey,
    pub capability: CapabilityKind,
    pub default_identifier: &'static str,
}

pub static CAPABILITY_DESCRIPTORS: [CapabilityDescriptor; 2] = [
    CapabilityDescriptor {
        key: JobPropertyKey::ExecutorServiceHandler,
        capability: CapabilityKind::ExecutorService,
        default_identifier: handlers::DEFAULT_EXECUTOR_SERVICE_HANDLER,
    },
    CapabilityDescriptor {
        key: JobPropertyKey::JobExceptionHandler,
        capability: CapabilityKind::JobException,
        default_identifier: handlers::DEFAULT_JOB_EXCEPTION_HANDLER,
    },
];

/// Configured implementation identifiers of a job, keyed by property key.
///
/// Recognized keys are stored under their configuration spelling whatever case
/// they arrive in (`EXECUTOR_SERVICE_HANDLER` becomes `executor_service_handler`);
/// when both spellings are present the configuration spelling wins. Unknown keys
/// are kept as-is so configuration round-trips, but only the keys in
/// [`JobPropertyKey`] are ever read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct JobProperties(BTreeMap<String, String>);

impl From<BTreeMap<String, String>> for JobProperties {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let mut properties = BTreeMap::new();
        for (key, identifier) in raw {
            match JobPropertyKey::from_key(&key) {
                Some(known) if known.key() == key => {
                    properties.insert(key, identifier);
                }
                Some(known) => {
                    properties
                        .entry(known.key().to_string())
                        .or_insert(identifier);
                }
                None => {
                    properties.insert(key, identifier);
                }
            }
        }
        Self(properties)
    }
}

impl From<JobProperties> for BTreeMap<String, String> {
    fn from(properties: JobProperties) -> Self {
        properties.0
    }
}

impl JobProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured identifier for `key`, empty when not configured
    pub fn get(&self, key: JobPropertyKey) -> &str {
        self.0.get(key.key()).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: JobPropertyKey, identifier: impl Into<String>) {
        self.0.insert(key.key().to_string(), identifier.into());
    }

    pub fn with(mut self, key: JobPropertyKey, identifier: impl Into<String>) -> Self {
        self.set(key, identifier);
        self
    }

    /// Keys present in the map that no capability reads
    pub fn unrecognized_keys(&self) -> Vec<&str> {
        self.0
            .keys()
            .filter(|k| JobPropertyKey::from_key(k).is_none())
            .map(String::as_str)
            .collect()
    }
}
