//! Configuration struct definitions.
//!
//! Every section carries `#[serde(default)]`, so a file only needs the keys
//! it changes.

use serde::{Deserialize, Serialize};

/// Default capacity of the service registry.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 512;

/// Default capacity of an event multiplexer.
pub const DEFAULT_MULTIPLEXER_CAPACITY: usize = 256;

/// Default name of the multiplexer dispatch thread.
pub const DEFAULT_DISPATCH_THREAD_NAME: &str = "portier-dispatch";

/// Root configuration of the broker core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service registry settings.
    pub registry: RegistrySection,
    /// Event multiplexer settings.
    pub multiplexer: MultiplexerSection,
    /// Logging level, format and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// RegistrySection
// ---------------------------------------------------------------------------

/// Service registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Maximum number of distinct offered services.
    pub capacity: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REGISTRY_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// MultiplexerSection
// ---------------------------------------------------------------------------

/// Event multiplexer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiplexerSection {
    /// Maximum number of simultaneously attached events.
    pub capacity: usize,
    /// Run callbacks on a thread owned by the multiplexer. When `false` the
    /// embedding process drives dispatch itself.
    pub background_dispatch: bool,
    /// Name of the dispatch thread.
    pub thread_name: String,
}

impl Default for MultiplexerSection {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MULTIPLEXER_CAPACITY,
            background_dispatch: true,
            thread_name: DEFAULT_DISPATCH_THREAD_NAME.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate directives (e.g. `["portier_events=trace"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
