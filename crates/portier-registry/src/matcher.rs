//! Wildcard matching of service descriptions.

use crate::description::ServiceDescription;

/// A discovery query over (service, instance, event).
///
/// Each absent field is a wildcard matching any stored value. The query is
/// resolved once into one of eight shapes so that a scan compares only the
/// fields that are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceQuery<'a> {
    /// Everything matches.
    All,
    /// Match on service only.
    Service(&'a str),
    /// Match on instance only.
    Instance(&'a str),
    /// Match on event only.
    Event(&'a str),
    /// Match on service and instance.
    ServiceInstance(&'a str, &'a str),
    /// Match on service and event.
    ServiceEvent(&'a str, &'a str),
    /// Match on instance and event.
    InstanceEvent(&'a str, &'a str),
    /// Match on all three identifiers.
    Exact(&'a str, &'a str, &'a str),
}

impl<'a> ServiceQuery<'a> {
    /// Build a query from optional fields; `None` is a wildcard.
    #[must_use]
    pub fn new(
        service: Option<&'a str>,
        instance: Option<&'a str>,
        event: Option<&'a str>,
    ) -> Self {
        match (service, instance, event) {
            (Some(s), Some(i), Some(e)) => Self::Exact(s, i, e),
            (Some(s), Some(i), None) => Self::ServiceInstance(s, i),
            (Some(s), None, Some(e)) => Self::ServiceEvent(s, e),
            (Some(s), None, None) => Self::Service(s),
            (None, Some(i), Some(e)) => Self::InstanceEvent(i, e),
            (None, Some(i), None) => Self::Instance(i),
            (None, None, Some(e)) => Self::Event(e),
            (None, None, None) => Self::All,
        }
    }

    /// Query for exactly one description.
    #[must_use]
    pub fn exact(description: &'a ServiceDescription) -> Self {
        Self::Exact(
            description.service().as_str(),
            description.instance().as_str(),
            description.event().as_str(),
        )
    }

    /// Whether every field is a wildcard.
    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Check whether `description` satisfies every present field.
    #[must_use]
    pub fn matches(&self, description: &ServiceDescription) -> bool {
        let service = description.service().as_str();
        let instance = description.instance().as_str();
        let event = description.event().as_str();

        match *self {
            Self::All => true,
            Self::Service(s) => service == s,
            Self::Instance(i) => instance == i,
            Self::Event(e) => event == e,
            Self::ServiceInstance(s, i) => service == s && instance == i,
            Self::ServiceEvent(s, e) => service == s && event == e,
            Self::InstanceEvent(i, e) => instance == i && event == e,
            Self::Exact(s, i, e) => service == s && instance == i && event == e,
        }
    }
}

impl Default for ServiceQuery<'_> {
    fn default() -> Self {
        Self::All
    }
}
