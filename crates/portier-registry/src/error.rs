//! Registry error types.

use thiserror::Error;

/// Errors that can occur with registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Every slot is occupied and the store has reached its capacity.
    ///
    /// Recoverable: retry after another description was removed.
    #[error("service registry full: all {capacity} slots are occupied")]
    Full {
        /// Maximum number of entries the registry holds.
        capacity: usize,
    },

    /// A description already carries the maximum number of offers.
    #[error("too many offers of {service}: count is at its maximum of {max}")]
    TooManyOffers {
        /// The description whose count cannot grow.
        service: String,
        /// Maximum offer count.
        max: u32,
    },

    /// An identifier exceeds the fixed identifier length.
    #[error("identifier too long: {len} bytes (max {max})")]
    IdTooLong {
        /// Length of the rejected identifier in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
