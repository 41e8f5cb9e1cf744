//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ServiceConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the optional file, apply `FANOUT_*` environment overrides, validate.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => toml::from_str::<ServiceConfig>(&fs::read_to_string(path)?)?,
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto `config`. `lookup` resolves a variable name.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("FANOUT_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("FANOUT_MAX_BODY_SIZE") {
        config.listener.max_body_size = parse("FANOUT_MAX_BODY_SIZE", v)?;
    }
    if let Some(v) = lookup("FANOUT_MAX_URLS") {
        config.limits.max_urls = parse("FANOUT_MAX_URLS", v)?;
    }
    if let Some(v) = lookup("FANOUT_ADMISSION_CAPACITY") {
        config.limits.admission_capacity = parse("FANOUT_ADMISSION_CAPACITY", v)?;
    }
    if let Some(v) = lookup("FANOUT_REQUEST_TIMEOUT_MS") {
        config.timeouts.request_ms = parse("FANOUT_REQUEST_TIMEOUT_MS", v)?;
    }
    if let Some(v) = lookup("FANOUT_FETCH_TIMEOUT_MS") {
        config.timeouts.fetch_ms = parse("FANOUT_FETCH_TIMEOUT_MS", v)?;
    }
    if let Some(v) = lookup("FANOUT_LOG_LEVEL") {
        config.observability.log_level = v;
    }
    if let Some(v) = lookup("FANOUT_LOG_FORMAT") {
        config.observability.log_format = v;
    }
    if let Some(v) = lookup("FANOUT_METRICS_ENABLED") {
        config.observability.metrics_enabled = parse("FANOUT_METRICS_ENABLED", v)?;
    }
    if let Some(v) = lookup("FANOUT_METRICS_ADDRESS") {
        config.observability.metrics_address = v;
    }
    Ok(())
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}
