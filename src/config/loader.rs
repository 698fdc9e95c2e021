//! Configuration Loader
//!
//! Environment-aware loading: the base file, then an optional
//! `<name>.<environment>.<ext>` override next to it, then `TASKER_JOBS__*`
//! environment variables (`TASKER_JOBS__EVENT_TRACE__PROCESSOR=...`).

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::JobsConfig;

const ENV_PREFIX: &str = "TASKER_JOBS";

#[derive(Debug)]
pub struct ConfigManager {
    config: JobsConfig,
    environment: String,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Load `path` for the environment detected from the process environment
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_file_with_env(path, &environment)
    }

    /// Load `path` for an explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_file_with_env(
        path: impl AsRef<Path>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let override_path = Self::environment_override_path(path, environment);

        debug!(
            file = %file_path,
            environment = %environment,
            override_file = ?override_path,
            "Loading job configuration"
        );

        let mut builder = config::Config::builder()
            .set_default("environment", environment)
            .map_err(|e| ConfigurationError::parse_error(&file_path, e))?
            .add_source(config::File::from(path).required(true));
        if let Some(override_path) = &override_path {
            builder = builder.add_source(config::File::from(override_path.as_path()).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .map_err(|e| ConfigurationError::parse_error(&file_path, e))?;

        let config: JobsConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::parse_error(&file_path, e))?;
        config.validate()?;

        info!(
            file = %file_path,
            environment = %config.environment,
            jobs = config.jobs.len(),
            "✅ CONFIG: Job configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            environment: config.environment.clone(),
            config,
            source: Some(path.to_path_buf()),
        }))
    }

    /// Wrap an already built configuration
    pub fn from_config(config: JobsConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            environment: config.environment.clone(),
            config,
            source: None,
        }))
    }

    pub fn config(&self) -> &JobsConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("TASKER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn environment_override_path(path: &Path, environment: &str) -> Option<PathBuf> {
        let stem = path.file_stem()?.to_str()?;
        let extension = path.extension()?.to_str()?;
        Some(path.with_file_name(format!("{stem}.{environment}.{extension}")))
    }
}
