//! Prelude module - commonly used types for convenient import.
//!
//! Use `use portier_events::prelude::*;` to import all essential types.

// Errors
pub use crate::{AttachError, AttachResult, MultiplexerError, MultiplexerResult};

// Sources
pub use crate::{EventSource, EventType, NoEvent, TriggerHandle, TriggerId};

// Multiplexer
pub use crate::{
    DEFAULT_MULTIPLEXER_CAPACITY, EventMultiplexer, EventVariable, MultiplexerOptions,
};
