//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_BIND_ADDRESS: &str = "APP_BIND_ADDRESS";
pub const ENV_LOG_LEVEL: &str = "APP_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "APP_LOG_FORMAT";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "APP_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_BODY_SIZE: &str = "APP_MAX_BODY_SIZE";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: file (if given), then process environment, then
/// validation.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => AppConfig::default(),
    };

    let config = apply_env_overrides(config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Overlay environment values onto `config`. `lookup` resolves a variable
/// name to its value.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level.to_ascii_lowercase();
    }
    if let Some(format) = lookup(ENV_LOG_FORMAT) {
        config.observability.log_format = format
            .parse::<LogFormat>()
            .map_err(|reason| ConfigError::Env { name: ENV_LOG_FORMAT, reason })?;
    }
    if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        config.timeouts.request_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &secs)?;
    }
    if let Some(size) = lookup(ENV_MAX_BODY_SIZE) {
        config.limits.max_body_size = parse_number(ENV_MAX_BODY_SIZE, &size)?;
    }

    Ok(config)
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        name,
        reason: e.to_string(),
    })
}
