//! # Job Configuration
//!
//! Job definitions and event trace settings, loaded from a YAML or TOML file
//! with environment variable overrides (see [`ConfigManager`]).
//!
//! ## Example
//!
//! ```yaml
//! environment: production
//! event_trace:
//!   processor: ""
//!   database_url: postgres://tasker@localhost/tasker_jobs
//! jobs:
//!   - job_name: settlement
//!     sharding_total_count: 3
//!     sharding_item_parameters: "0=Beijing,1=Shanghai,2=Guangzhou"
//!     job_properties:
//!       executor_service_handler: SingleThreadExecutorServiceHandler
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::registry::JobProperties;

fn default_sharding_total_count() -> u32 {
    1
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_true() -> bool {
    true
}

/// Definition of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfiguration {
    pub job_name: String,

    #[serde(default = "default_sharding_total_count")]
    pub sharding_total_count: u32,

    /// Per-item parameters in `item=parameter` form, comma separated
    #[serde(default)]
    pub sharding_item_parameters: String,

    #[serde(default)]
    pub job_parameter: String,

    #[serde(default)]
    pub description: String,

    /// Handler identifiers keyed by job property key
    #[serde(default)]
    pub job_properties: JobProperties,
}

impl JobConfiguration {
    pub fn new(job_name: impl Into<String>, sharding_total_count: u32) -> Self {
        Self {
            job_name: job_name.into(),
            sharding_total_count,
            sharding_item_parameters: String::new(),
            job_parameter: String::new(),
            description: String::new(),
            job_properties: JobProperties::default(),
        }
    }

    pub fn with_job_properties(mut self, job_properties: JobProperties) -> Self {
        self.job_properties = job_properties;
        self
    }

    pub fn with_sharding_item_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.sharding_item_parameters = parameters.into();
        self
    }

    pub fn with_job_parameter(mut self, job_parameter: impl Into<String>) -> Self {
        self.job_parameter = job_parameter.into();
        self
    }

    /// Parse `sharding_item_parameters` into item → parameter
    pub fn parsed_sharding_item_parameters(&self) -> ConfigResult<BTreeMap<u32, String>> {
        let mut parameters = BTreeMap::new();
        for pair in self
            .sharding_item_parameters
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
        {
            let (item, parameter) = pair.split_once('=').ok_or_else(|| {
                ConfigurationError::invalid_value(
                    "sharding_item_parameters",
                    pair,
                    format!("job '{}': expected 'item=parameter'", self.job_name),
                )
            })?;
            let item: u32 = item.trim().parse().map_err(|_| {
                ConfigurationError::invalid_value(
                    "sharding_item_parameters",
                    pair,
                    format!("job '{}': shard item must be a non-negative integer", self.job_name),
                )
            })?;
            if item >= self.sharding_total_count {
                return Err(ConfigurationError::invalid_value(
                    "sharding_item_parameters",
                    pair,
                    format!(
                        "job '{}': shard item {item} is not below sharding_total_count {}",
                        self.job_name, self.sharding_total_count
                    ),
                ));
            }
            parameters.insert(item, parameter.trim().to_string());
        }
        Ok(parameters)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.job_name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "job_name",
                "job configuration",
            ));
        }
        if self.sharding_total_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "sharding_total_count",
                "0",
                format!("job '{}': must be greater than zero", self.job_name),
            ));
        }
        self.parsed_sharding_item_parameters()?;
        Ok(())
    }
}

/// Where trace events of all jobs go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTraceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Custom processor identifier; empty binds the built-in processor
    #[serde(default)]
    pub processor: String,

    /// PostgreSQL URL for the event storage; in-memory storage when absent
    #[serde(default)]
    pub database_url: Option<String>,
}

impl Default for EventTraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            processor: String::new(),
            database_url: None,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub jobs: Vec<JobConfiguration>,

    #[serde(default)]
    pub event_trace: EventTraceConfig,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            jobs: Vec::new(),
            event_trace: EventTraceConfig::default(),
        }
    }
}

impl JobsConfig {
    pub fn job(&self, job_name: &str) -> Option<&JobConfiguration> {
        self.jobs.iter().find(|job| job.job_name == job_name)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !seen.insert(job.job_name.as_str()) {
                return Err(ConfigurationError::validation_error(format!(
                    "job '{}' is defined more than once",
                    job.job_name
                )));
            }
        }
        Ok(())
    }

    pub fn is_production_environment(&self) -> bool {
        self.environment == "production"
    }
}
