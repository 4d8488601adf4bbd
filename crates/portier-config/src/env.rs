//! `PORTIER_*` environment overrides.
//!
//! Environment variables override every file layer. Values are coerced to
//! the type of the field they set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::set_path;

/// Type of the field an environment variable sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Integer,
    Bool,
    Text,
}

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: FieldKind,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "PORTIER_REGISTRY_CAPACITY",
        field_path: "registry.capacity",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "PORTIER_MULTIPLEXER_CAPACITY",
        field_path: "multiplexer.capacity",
        kind: FieldKind::Integer,
    },
    EnvMapping {
        var_name: "PORTIER_BACKGROUND_DISPATCH",
        field_path: "multiplexer.background_dispatch",
        kind: FieldKind::Bool,
    },
    EnvMapping {
        var_name: "PORTIER_DISPATCH_THREAD_NAME",
        field_path: "multiplexer.thread_name",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "PORTIER_LOG_LEVEL",
        field_path: "logging.level",
        kind: FieldKind::Text,
    },
    EnvMapping {
        var_name: "PORTIER_LOG_FORMAT",
        field_path: "logging.format",
        kind: FieldKind::Text,
    },
];

/// Snapshot the `PORTIER_*` variables of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(name, _)| name.starts_with("PORTIER_"))
        .collect()
}

/// Apply every mapped variable present in `env_vars` to `merged`.
///
/// Returns the names of the variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a value cannot be coerced to its
/// field's type.
pub fn apply_env_overrides<S: BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Vec<String>> {
    let mut applied = Vec::new();

    for mapping in ENV_MAPPINGS {
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };
        let value = coerce(mapping, raw)?;

        if !set_path(merged, mapping.field_path, value) {
            return Err(ConfigError::EnvError {
                var_name: mapping.var_name.to_owned(),
                message: format!("cannot set '{}'", mapping.field_path),
            });
        }
        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applied environment override"
        );
        applied.push(mapping.var_name.to_owned());
    }

    Ok(applied)
}

fn coerce(mapping: &EnvMapping, raw: &str) -> ConfigResult<toml::Value> {
    let raw = raw.trim();
    let invalid = |expected: &str| ConfigError::EnvError {
        var_name: mapping.var_name.to_owned(),
        message: format!("expected {expected}, got '{raw}'"),
    };

    match mapping.kind {
        FieldKind::Integer => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| invalid("an integer")),
        FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(toml::Value::Boolean(true)),
            "0" | "false" | "no" | "off" => Ok(toml::Value::Boolean(false)),
            _ => Err(invalid("a boolean")),
        },
        FieldKind::Text => Ok(toml::Value::String(raw.to_owned())),
    }
}
