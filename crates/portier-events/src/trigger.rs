//! Handle binding an origin's event to a multiplexer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use tracing::trace;

use crate::multiplexer::Shared;
use crate::source::TriggerId;

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate the process-wide unique part of a [`TriggerId`].
pub(crate) fn next_unique_id() -> u64 {
    NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Binding between an origin's event, the multiplexer's
/// [`EventVariable`](crate::EventVariable) and the multiplexer's removal path.
///
/// Handed to the origin by [`EventSource::enable`](crate::EventSource::enable).
/// The handle refers back to its multiplexer weakly; once the multiplexer is
/// gone, [`TriggerHandle::trigger`] and [`TriggerHandle::reset`] are no-ops.
///
/// A handle only signals while its own attachment occupies the slot. A handle
/// left armed after its attachment was removed never fires a later occupant.
///
/// Dropping a valid handle resets it.
#[derive(Debug)]
pub struct TriggerHandle {
    owner: Weak<Shared>,
    id: TriggerId,
    valid: bool,
}

impl TriggerHandle {
    pub(crate) fn new(owner: Weak<Shared>, id: TriggerId) -> Self {
        Self {
            owner,
            id,
            valid: true,
        }
    }

    /// Signal the event. Returns `false` if the handle is no longer valid, its
    /// attachment was removed or the multiplexer stopped listening.
    pub fn trigger(&self) -> bool {
        if !self.valid {
            return false;
        }
        self.owner
            .upgrade()
            .is_some_and(|owner| owner.signal(self.id))
    }

    /// Remove the attachment from the multiplexer and disarm the handle.
    ///
    /// Waits for the event's callback if it is running on another thread.
    /// Calling it again is a no-op.
    pub fn reset(&mut self) {
        if !std::mem::replace(&mut self.valid, false) {
            return;
        }
        trace!(trigger_id = %self.id, "Resetting trigger handle");
        if let Some(owner) = self.owner.upgrade() {
            owner.remove_trigger(self.id);
        }
    }

    /// Disarm the handle without calling back into the multiplexer.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Whether the handle is still armed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Id of the attachment this handle belongs to.
    #[must_use]
    pub fn id(&self) -> TriggerId {
        self.id
    }

    /// Whether this handle belongs to `trigger_id`.
    #[must_use]
    pub fn matches(&self, trigger_id: TriggerId) -> bool {
        self.id == trigger_id
    }
}

impl Drop for TriggerHandle {
    fn drop(&mut self) {
        self.reset();
    }
}
