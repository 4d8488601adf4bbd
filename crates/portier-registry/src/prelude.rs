//! Prelude module - commonly used types for convenient import.
//!
//! Use `use portier_registry::prelude::*;` to import all essential types.

// Errors
pub use crate::{RegistryError, RegistryResult};

// Descriptions
pub use crate::{IdString, MAX_ID_STRING_LENGTH, ServiceDescription};

// Registry and queries
pub use crate::{DEFAULT_REGISTRY_CAPACITY, ServiceQuery, ServiceRegistry};
