//! Capability traits implemented by attachable event sources.

use std::fmt;

use crate::trigger::TriggerHandle;

/// Identifies one attached event across every multiplexer of the process.
///
/// `slot` is the index in the owning multiplexer's table; `unique` tells
/// apart handles that occupied the same slot at different times or in
/// different multiplexers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerId {
    slot: usize,
    unique: u64,
}

impl TriggerId {
    pub(crate) fn new(slot: usize, unique: u64) -> Self {
        Self { slot, unique }
    }

    /// Slot index inside the owning multiplexer.
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Process-wide unique part of the id.
    #[must_use]
    pub fn unique(&self) -> u64 {
        self.unique
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot, self.unique)
    }
}

/// An enumeration of the events a source can raise.
///
/// The numeric id only has to be unique within one enumeration type; the
/// multiplexer also keys on the type itself.
pub trait EventType: Copy + Send + Sync + 'static {
    /// Numeric identifier of this event.
    fn event_id(self) -> u64;
}

/// Event type of sources that raise a single, unnamed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NoEvent {
    /// The source's only event.
    #[default]
    Placeholder,
}

impl NoEvent {
    /// Event id used when an origin is attached without an event type.
    pub const PLACEHOLDER_ID: u64 = 0;
}

impl EventType for NoEvent {
    fn event_id(self) -> u64 {
        Self::PLACEHOLDER_ID
    }
}

/// Capabilities the multiplexer needs from an attachable origin.
///
/// The multiplexer never touches any other state of the origin. Origins are
/// shared as `Arc<Self>` and keep their [`TriggerHandle`]s behind interior
/// mutability.
///
/// `disable` is expected to reset the handle it stored in `enable`. Resetting
/// waits for a callback of that event running on another thread, so the
/// handle must be reset after releasing any lock the callback itself takes.
pub trait EventSource: Send + Sync + 'static {
    /// Events this source can raise. Use [`NoEvent`] for a single event.
    type Event: EventType;

    /// Store `handle` and trigger it whenever `event` occurs.
    ///
    /// `event` is `None` when the origin was attached without an event type.
    fn enable(&self, handle: TriggerHandle, event: Option<Self::Event>);

    /// Stop triggering `event` and reset its handle.
    fn disable(&self, event: Option<Self::Event>);

    /// The multiplexer owning `trigger_id` is going away; disarm the matching
    /// handle without calling back into the multiplexer.
    fn invalidate(&self, trigger_id: TriggerId);
}
