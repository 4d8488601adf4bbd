//! Multiplexer error types.

use thiserror::Error;

/// Errors returned when attaching an event to a multiplexer.
///
/// A failed attach leaves the multiplexer and the origin untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// Every slot of the multiplexer is in use.
    #[error("event multiplexer full: all {capacity} slots are attached")]
    CapacityExhausted {
        /// Maximum number of simultaneously attached events.
        capacity: usize,
    },

    /// The same event of the same origin is already attached.
    #[error("event {event_id} of this origin is already attached")]
    AlreadyAttached {
        /// Numeric identifier of the duplicate event.
        event_id: u64,
    },
}

/// Result type for attach operations.
pub type AttachResult<T> = Result<T, AttachError>;

/// Errors that can occur while constructing a multiplexer.
#[derive(Debug, Error)]
pub enum MultiplexerError {
    /// The background dispatch thread could not be started.
    #[error("failed to spawn dispatch thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for multiplexer construction.
pub type MultiplexerResult<T> = Result<T, MultiplexerError>;
