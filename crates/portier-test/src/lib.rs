//! Portier Test - Shared test utilities for the Portier broker core.
//!
//! This crate provides mock event sources, fixtures and logging helpers used
//! by the integration tests.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! portier-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use portier_events::EventMultiplexer;
//! use portier_test::MockTrigger;
//! use std::sync::Arc;
//!
//! let multiplexer = EventMultiplexer::manual(4);
//! let trigger = Arc::new(MockTrigger::new());
//! multiplexer.attach(&trigger, MockTrigger::on_trigger).unwrap();
//!
//! trigger.trigger();
//! multiplexer.dispatch_pending();
//! assert_eq!(trigger.hits(), 1);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod logging;
pub mod mocks;

pub use fixtures::*;
pub use logging::*;
pub use mocks::*;
