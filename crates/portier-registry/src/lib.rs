//! Portier Registry - Service registry for the Portier broker.
//!
//! This crate provides:
//! - Identifier strings bounded to the middleware's fixed capacity
//! - Service descriptions (service, instance, event)
//! - A bounded, slot-reusing multiset store of offered services
//! - Wildcard discovery queries over the store
//!
//! # Architecture
//!
//! The broker calls [`ServiceRegistry::add`] whenever a publisher offers a
//! service and [`ServiceRegistry::remove`] when it stops offering it. Equal
//! offers share one slot with a reference count, so the description stays
//! discoverable until the last offer is withdrawn. [`ServiceRegistry::purge`]
//! drops a description regardless of its count, e.g. when the owning process
//! died.
//!
//! The registry performs no locking. The broker serializes access.
//!
//! # Example
//!
//! ```rust
//! use portier_registry::{ServiceDescription, ServiceRegistry};
//!
//! # fn main() -> Result<(), portier_registry::RegistryError> {
//! let mut registry = ServiceRegistry::with_capacity(16);
//!
//! let radar = ServiceDescription::new("Radar", "FrontLeft", "Objects")?;
//! registry.add(&radar)?;
//! registry.add(&radar)?;
//!
//! // Two offers, one entry.
//! assert_eq!(registry.get_services().len(), 1);
//! assert_eq!(registry.count(&radar), 2);
//!
//! // Wildcard discovery: every event of every "Radar" instance.
//! let found = registry.find(Some("Radar"), None, None);
//! assert_eq!(found, vec![radar]);
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

mod description;
mod error;
mod matcher;
mod registry;

pub use description::{IdString, MAX_ID_STRING_LENGTH, ServiceDescription};
pub use error::{RegistryError, RegistryResult};
pub use matcher::ServiceQuery;
pub use registry::{DEFAULT_REGISTRY_CAPACITY, ServiceRegistry};
