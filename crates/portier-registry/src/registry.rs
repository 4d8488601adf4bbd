//! Bounded multiset store of offered services.

use tracing::{debug, trace, warn};

use crate::description::ServiceDescription;
use crate::error::{RegistryError, RegistryResult};
use crate::matcher::ServiceQuery;

/// Default maximum number of distinct descriptions in a registry.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 512;

/// One occupied slot: a description and the number of live offers for it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ServiceDescriptionEntry {
    description: ServiceDescription,
    count: u32,
}

impl ServiceDescriptionEntry {
    fn new(description: ServiceDescription) -> Self {
        Self {
            description,
            count: 1,
        }
    }
}

/// Registry of currently offered services with multiset semantics.
///
/// Slots are reused after removal. The registry remembers only the most
/// recently vacated slot as a fast path; any older hole is found by a linear
/// scan on a later insertion.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    entries: Vec<Option<ServiceDescriptionEntry>>,
    free_index: Option<usize>,
    capacity: usize,
}

impl ServiceRegistry {
    /// Create an empty registry with [`DEFAULT_REGISTRY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REGISTRY_CAPACITY)
    }

    /// Create an empty registry holding at most `capacity` descriptions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_index: None,
            capacity,
        }
    }

    /// Create an empty registry sized by the `[registry]` configuration
    /// section.
    #[cfg(feature = "config")]
    #[must_use]
    pub fn from_section(section: &portier_config::RegistrySection) -> Self {
        Self::with_capacity(section.capacity)
    }

    /// Add one offer of `description`.
    ///
    /// An equal description already present only has its count increased.
    /// A new description fills, in order of preference, the most recently
    /// vacated slot, the first empty slot, or a new slot at the end.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Full`] if the description is new, no slot is empty
    ///   and the registry reached its capacity
    /// - [`RegistryError::TooManyOffers`] if the description's count is
    ///   already `u32::MAX`; the count is left unchanged
    pub fn add(&mut self, description: &ServiceDescription) -> RegistryResult<()> {
        if let Some(entry) = self.entry_mut(description) {
            let Some(count) = entry.count.checked_add(1) else {
                warn!(service = %description, "Service offer count at maximum");
                return Err(RegistryError::TooManyOffers {
                    service: description.to_string(),
                    max: u32::MAX,
                });
            };
            entry.count = count;
            trace!(service = %description, count, "Service offer counted");
            return Ok(());
        }

        let entry = ServiceDescriptionEntry::new(description.clone());

        if let Some(index) = self.free_index.take() {
            if let Some(slot) = self.entries.get_mut(index) {
                debug_assert!(slot.is_none(), "cached free slot must be empty");
                *slot = Some(entry);
                debug!(service = %description, index, "Service added in cached free slot");
                return Ok(());
            }
        }

        if let Some((index, slot)) = self
            .entries
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_none())
        {
            *slot = Some(entry);
            debug!(service = %description, index, "Service added in empty slot");
            return Ok(());
        }

        if self.entries.len() < self.capacity {
            self.entries.push(Some(entry));
            debug!(
                service = %description,
                index = self.entries.len().saturating_sub(1),
                "Service added in new slot"
            );
            return Ok(());
        }

        warn!(
            service = %description,
            capacity = self.capacity,
            "Service registry full"
        );
        Err(RegistryError::Full {
            capacity: self.capacity,
        })
    }

    /// Withdraw one offer of `description`.
    ///
    /// The entry is removed once its last offer is withdrawn; its slot then
    /// becomes the cached free slot. Unknown descriptions are ignored.
    pub fn remove(&mut self, description: &ServiceDescription) {
        let Some(index) = self.find_index(description) else {
            trace!(service = %description, "Remove of unknown service ignored");
            return;
        };
        let Some(slot) = self.entries.get_mut(index) else {
            return;
        };

        if let Some(entry) = slot.as_mut().filter(|entry| entry.count > 1) {
            entry.count = entry.count.saturating_sub(1);
            trace!(service = %description, count = entry.count, "Service offer withdrawn");
            return;
        }

        *slot = None;
        // reuse the slot on the next insertion
        self.free_index = Some(index);
        debug!(service = %description, index, "Service removed");
    }

    /// Remove `description` regardless of how many offers it has.
    ///
    /// Used for cleanup when the offering process is gone. Unknown
    /// descriptions are ignored.
    pub fn purge(&mut self, description: &ServiceDescription) {
        let Some(index) = self.find_index(description) else {
            trace!(service = %description, "Purge of unknown service ignored");
            return;
        };
        if let Some(slot) = self.entries.get_mut(index) {
            let count = slot.take().map_or(0, |entry| entry.count);
            self.free_index = Some(index);
            debug!(service = %description, index, count, "Service purged");
        }
    }

    /// Find every description matching the present fields.
    ///
    /// `None` is a wildcard. With all three fields absent this returns the
    /// same as [`ServiceRegistry::get_services`]. Results follow storage
    /// order, which is not insertion order once slots were reused.
    #[must_use]
    pub fn find(
        &self,
        service: Option<&str>,
        instance: Option<&str>,
        event: Option<&str>,
    ) -> Vec<ServiceDescription> {
        self.find_query(&ServiceQuery::new(service, instance, event))
    }

    /// Find every description matching a prebuilt query.
    #[must_use]
    pub fn find_query(&self, query: &ServiceQuery<'_>) -> Vec<ServiceDescription> {
        if query.is_all() {
            return self.get_services();
        }
        self.occupied()
            .filter(|entry| query.matches(&entry.description))
            .map(|entry| entry.description.clone())
            .collect()
    }

    /// Snapshot of every stored description, independent of counts.
    #[must_use]
    pub fn get_services(&self) -> Vec<ServiceDescription> {
        self.occupied()
            .map(|entry| entry.description.clone())
            .collect()
    }

    /// Number of live offers of `description` (0 if absent).
    #[must_use]
    pub fn count(&self, description: &ServiceDescription) -> u32 {
        self.occupied()
            .find(|entry| entry.description == *description)
            .map_or(0, |entry| entry.count)
    }

    /// Number of stored descriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    /// Whether no description is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupied().next().is_none()
    }

    /// Number of slots in use by the store, holes included.
    #[must_use]
    pub fn slots(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of distinct descriptions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn occupied(&self) -> impl Iterator<Item = &ServiceDescriptionEntry> {
        self.entries.iter().flatten()
    }

    fn find_index(&self, description: &ServiceDescription) -> Option<usize> {
        self.entries.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|entry| entry.description == *description)
        })
    }

    fn entry_mut(
        &mut self,
        description: &ServiceDescription,
    ) -> Option<&mut ServiceDescriptionEntry> {
        self.entries
            .iter_mut()
            .flatten()
            .find(|entry| entry.description == *description)
    }

    #[cfg(test)]
    fn index_of(&self, description: &ServiceDescription) -> Option<usize> {
        self.find_index(description)
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
