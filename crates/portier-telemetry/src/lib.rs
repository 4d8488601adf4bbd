//! Portier Telemetry - Logging setup for the Portier broker core.
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - Rolling file output through `tracing-appender`
//! - With the `config` feature, conversion from the `[logging]` section of
//!   `portier-config`
//!
//! The component crates only emit `tracing` events; the embedding process
//! installs the subscriber once at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use portier_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), portier_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_thread_info()
//!     .with_directive("portier_events=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Broker core starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
