//! Portier Events - Event multiplexer for the Portier middleware.
//!
//! This crate provides:
//! - The [`EventSource`] capability trait implemented by attachable origins
//! - [`EventMultiplexer`], which attaches callbacks to origins and invokes
//!   them when the origins trigger
//! - [`TriggerHandle`], the binding an origin uses to signal its event
//! - [`EventVariable`], the notification object handles signal and the
//!   dispatcher waits on
//!
//! # Architecture
//!
//! ```text
//! origin ──trigger()──► EventVariable ──wait()──► dispatcher ──invoke(slot)──► callback(&origin)
//!    ▲                                                                   │
//!    └────────────── enable(handle) ◄── EventMultiplexer::attach ◄───────┘
//! ```
//!
//! Records are type-erased so one multiplexer serves origins of any type.
//! The origin is held weakly: dropping it detaches its events, and a
//! dropped origin is never called. Detaching waits for a callback of the
//! same event running on another thread, so no callback outlives its
//! detach.
//!
//! The crate contains no `unsafe` code.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod multiplexer;
mod source;
mod table;
mod trigger;
mod variable;

pub use error::{AttachError, AttachResult, MultiplexerError, MultiplexerResult};
pub use multiplexer::{
    DEFAULT_DISPATCH_THREAD_NAME, DEFAULT_MULTIPLEXER_CAPACITY, EventMultiplexer,
    MultiplexerOptions,
};
pub use source::{EventSource, EventType, NoEvent, TriggerId};
pub use trigger::TriggerHandle;
pub use variable::EventVariable;
