//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Largest accepted multiplexer capacity.
pub const MAX_MULTIPLEXER_CAPACITY: usize = 4096;

/// Accepted `logging.level` values.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_registry(config)?;
    validate_multiplexer(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_registry(config: &Config) -> ConfigResult<()> {
    if config.registry.capacity == 0 {
        return Err(invalid("registry.capacity", "must be greater than 0"));
    }
    Ok(())
}

fn validate_multiplexer(config: &Config) -> ConfigResult<()> {
    let m = &config.multiplexer;

    if m.capacity == 0 || m.capacity > MAX_MULTIPLEXER_CAPACITY {
        return Err(invalid(
            "multiplexer.capacity",
            format!(
                "capacity {} is out of range; must be between 1 and {MAX_MULTIPLEXER_CAPACITY}",
                m.capacity
            ),
        ));
    }

    if m.background_dispatch && m.thread_name.trim().is_empty() {
        return Err(invalid(
            "multiplexer.thread_name",
            "must not be empty when background_dispatch is enabled",
        ));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_LEVELS.contains(&l.level.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: {}",
                l.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if !LOG_FORMATS.contains(&l.format.to_ascii_lowercase().as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }

    if let Some(empty) = l.directives.iter().position(|d| d.trim().is_empty()) {
        return Err(invalid(
            "logging.directives",
            format!("directive #{empty} is empty"),
        ));
    }

    Ok(())
}
