//! Service descriptions and their identifier strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

use crate::error::{RegistryError, RegistryResult};

/// Maximum length of an identifier in bytes.
pub const MAX_ID_STRING_LENGTH: usize = 100;

/// An identifier of at most [`MAX_ID_STRING_LENGTH`] bytes.
///
/// Identifiers travel through fixed-size shared-memory records, so longer
/// strings are rejected at construction instead of being truncated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdString(String);

impl IdString {
    /// Create a new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdTooLong`] if `value` exceeds
    /// [`MAX_ID_STRING_LENGTH`] bytes.
    pub fn new(value: impl Into<String>) -> RegistryResult<Self> {
        let value = value.into();
        if value.len() > MAX_ID_STRING_LENGTH {
            return Err(RegistryError::IdTooLong {
                len: value.len(),
                max: MAX_ID_STRING_LENGTH,
            });
        }
        Ok(Self(value))
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for IdString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for IdString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for IdString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for IdString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for IdString {
    type Error = RegistryError;

    fn try_from(value: String) -> RegistryResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for IdString {
    type Error = RegistryError;

    fn try_from(value: &str) -> RegistryResult<Self> {
        Self::new(value)
    }
}

impl From<IdString> for String {
    fn from(value: IdString) -> Self {
        value.0
    }
}

impl fmt::Display for IdString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one event of one instance of a service.
///
/// Two descriptions are the same offer when all three identifiers are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceDescription {
    service: IdString,
    instance: IdString,
    event: IdString,
}

impl ServiceDescription {
    /// Create a description from three identifier strings.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdTooLong`] if any identifier exceeds
    /// [`MAX_ID_STRING_LENGTH`] bytes.
    pub fn new(
        service: impl Into<String>,
        instance: impl Into<String>,
        event: impl Into<String>,
    ) -> RegistryResult<Self> {
        Ok(Self::from_ids(
            IdString::new(service)?,
            IdString::new(instance)?,
            IdString::new(event)?,
        ))
    }

    /// Create a description from already validated identifiers.
    #[must_use]
    pub fn from_ids(service: IdString, instance: IdString, event: IdString) -> Self {
        Self {
            service,
            instance,
            event,
        }
    }

    /// The service identifier.
    #[must_use]
    pub fn service(&self) -> &IdString {
        &self.service
    }

    /// The instance identifier.
    #[must_use]
    pub fn instance(&self) -> &IdString {
        &self.instance
    }

    /// The event identifier.
    #[must_use]
    pub fn event(&self) -> &IdString {
        &self.event
    }
}

impl fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service, self.instance, self.event)
    }
}
