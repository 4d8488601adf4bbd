//! Fixed-capacity table of type-erased event records.
//!
//! Every record stores the origin weakly together with a translator
//! monomorphized for the origin's concrete type at attach time. Invocation
//! goes through the translator, which recovers `&T` and `fn(&T)` from their
//! erased forms, so the table itself stays homogeneous.
//!
//! Synchronization: one mutex guards the records and a per-slot in-flight
//! marker naming the thread that is currently running the slot's callback.
//! The callback runs without the mutex held. Removing a slot waits until no
//! other thread is running it; the invoking thread itself may remove its own
//! slot (a callback detaching itself, or an origin dropped from within its
//! callback).

use parking_lot::{Condvar, Mutex};
use std::any::{Any, TypeId};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{trace, warn};

use crate::error::{AttachError, AttachResult};
use crate::source::{EventSource, TriggerId};

type Erased = dyn Any + Send + Sync;

/// Recovers `&T` and `fn(&T)` and calls the callback.
type Translator = fn(&Erased, &Erased);

/// Recovers `&T` and calls [`EventSource::invalidate`].
type Invalidator = fn(&Erased, TriggerId);

fn translate_and_call<T: EventSource>(origin: &Erased, callback: &Erased) {
    if let (Some(origin), Some(callback)) = (
        origin.downcast_ref::<T>(),
        callback.downcast_ref::<fn(&T)>(),
    ) {
        callback(origin);
    }
}

fn translate_and_invalidate<T: EventSource>(origin: &Erased, trigger_id: TriggerId) {
    if let Some(origin) = origin.downcast_ref::<T>() {
        origin.invalidate(trigger_id);
    }
}

/// Key identifying one event of one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EventKey {
    pub(crate) origin_addr: usize,
    pub(crate) event_id: u64,
    pub(crate) type_tag: TypeId,
}

impl EventKey {
    pub(crate) fn new<T: EventSource>(origin: &Arc<T>, event_id: u64, type_tag: TypeId) -> Self {
        Self {
            origin_addr: Arc::as_ptr(origin).cast::<()>().addr(),
            event_id,
            type_tag,
        }
    }
}

/// A type-erased attachment.
///
/// The callback is erased behind an `Arc`, which costs one allocation per
/// attach and keeps the crate free of `unsafe` pointer casts. Dispatch itself
/// does not allocate.
pub(crate) struct EventRecord {
    key: EventKey,
    trigger_id: TriggerId,
    origin: Weak<Erased>,
    callback: Arc<Erased>,
    translator: Translator,
    invalidator: Invalidator,
}

impl std::fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecord")
            .field("trigger_id", &self.trigger_id)
            .field("event_id", &self.key.event_id)
            .field("origin_alive", &(self.origin.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

impl EventRecord {
    pub(crate) fn new<T: EventSource>(origin: &Arc<T>, key: EventKey, callback: fn(&T)) -> Self {
        let origin: Weak<T> = Arc::downgrade(origin);
        Self {
            key,
            // filled in by `EventTable::insert`
            trigger_id: TriggerId::new(0, 0),
            origin,
            callback: Arc::new(callback),
            translator: translate_and_call::<T>,
            invalidator: translate_and_invalidate::<T>,
        }
    }

    pub(crate) fn trigger_id(&self) -> TriggerId {
        self.trigger_id
    }

    pub(crate) fn key(&self) -> &EventKey {
        &self.key
    }

    fn is_live_duplicate_of(&self, key: &EventKey) -> bool {
        self.key == *key && self.origin.strong_count() > 0
    }

    /// Call the origin's invalidation capability if it is still alive.
    pub(crate) fn invalidate_origin(&self) {
        if let Some(origin) = self.origin.upgrade() {
            (self.invalidator)(&*origin, self.trigger_id);
        }
    }
}

#[derive(Debug)]
struct TableState {
    records: Vec<Option<EventRecord>>,
    in_flight: Vec<Option<ThreadId>>,
    /// Free slot indices, popped from the back.
    free: Vec<usize>,
}

impl TableState {
    fn busy_elsewhere(&self, slot: usize, me: ThreadId) -> bool {
        matches!(self.in_flight.get(slot), Some(Some(invoker)) if *invoker != me)
    }
}

/// Outcome of [`EventTable::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Invocation {
    /// The callback ran to completion.
    Called,
    /// The callback panicked; the panic was contained.
    Panicked,
    /// Nothing attached in the slot, or its origin is gone.
    Vacant,
}

#[derive(Debug)]
pub(crate) struct EventTable {
    state: Mutex<TableState>,
    idle: Condvar,
    capacity: usize,
}

impl EventTable {
    pub(crate) fn new(capacity: usize) -> Self {
        let mut records = Vec::with_capacity(capacity);
        records.resize_with(capacity, || None);
        Self {
            state: Mutex::new(TableState {
                records,
                in_flight: vec![None; capacity],
                free: (0..capacity).rev().collect(),
            }),
            idle: Condvar::new(),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        let state = self.state.lock();
        state.records.len().saturating_sub(state.free.len())
    }

    pub(crate) fn contains(&self, key: &EventKey) -> bool {
        self.state
            .lock()
            .records
            .iter()
            .flatten()
            .any(|record| record.is_live_duplicate_of(key))
    }

    /// Store `record` in a free slot and assign its trigger id.
    pub(crate) fn insert(&self, mut record: EventRecord, unique: u64) -> AttachResult<TriggerId> {
        let mut state = self.state.lock();

        if state
            .records
            .iter()
            .flatten()
            .any(|existing| existing.is_live_duplicate_of(&record.key))
        {
            return Err(AttachError::AlreadyAttached {
                event_id: record.key.event_id,
            });
        }

        let Some(slot) = state.free.pop() else {
            return Err(AttachError::CapacityExhausted {
                capacity: self.capacity,
            });
        };

        let trigger_id = TriggerId::new(slot, unique);
        record.trigger_id = trigger_id;
        if let Some(entry) = state.records.get_mut(slot) {
            *entry = Some(record);
        }
        Ok(trigger_id)
    }

    /// Remove the record of `trigger_id`, waiting for a callback of that
    /// slot running on another thread to finish first.
    ///
    /// A stale id (slot vacated or reused since) removes nothing.
    pub(crate) fn remove(&self, trigger_id: TriggerId) -> Option<EventRecord> {
        self.remove_where(trigger_id.slot(), |record| record.trigger_id == trigger_id)
    }

    /// Remove the live record of `key`, if any.
    pub(crate) fn remove_key(&self, key: &EventKey) -> Option<EventRecord> {
        let slot = {
            let state = self.state.lock();
            state.records.iter().position(|record| {
                record
                    .as_ref()
                    .is_some_and(|record| record.is_live_duplicate_of(key))
            })?
        };
        self.remove_where(slot, |record| record.key == *key)
    }

    fn remove_where(
        &self,
        slot: usize,
        matches: impl Fn(&EventRecord) -> bool,
    ) -> Option<EventRecord> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state.busy_elsewhere(slot, me) {
            self.idle.wait(&mut state);
        }

        let entry = state.records.get_mut(slot)?;
        if !entry.as_ref().is_some_and(&matches) {
            return None;
        }
        let record = entry.take();
        state.free.push(slot);
        record
    }

    /// Run `notify` if `trigger_id` still owns its slot.
    ///
    /// The table stays locked while `notify` runs, so a removal cannot slip
    /// between the check and the notification.
    pub(crate) fn signal(&self, trigger_id: TriggerId, notify: impl FnOnce() -> bool) -> bool {
        let state = self.state.lock();
        let current = state
            .records
            .get(trigger_id.slot())
            .and_then(Option::as_ref)
            .is_some_and(|record| record.trigger_id == trigger_id);
        if !current {
            trace!(trigger_id = %trigger_id, "Signal of a removed attachment ignored");
            return false;
        }
        notify()
    }

    /// Run the callback stored in `slot`.
    pub(crate) fn invoke(&self, slot: usize) -> Invocation {
        let me = thread::current().id();

        let (origin, callback, translator, trigger_id) = {
            let mut state = self.state.lock();
            while state.busy_elsewhere(slot, me) {
                self.idle.wait(&mut state);
            }
            if matches!(state.in_flight.get(slot), Some(Some(_))) {
                // Re-entrant invoke of the slot whose callback is running.
                return Invocation::Vacant;
            }

            let Some(record) = state.records.get(slot).and_then(Option::as_ref) else {
                return Invocation::Vacant;
            };
            let Some(origin) = record.origin.upgrade() else {
                return Invocation::Vacant;
            };
            let parts = (
                origin,
                Arc::clone(&record.callback),
                record.translator,
                record.trigger_id,
            );
            if let Some(marker) = state.in_flight.get_mut(slot) {
                *marker = Some(me);
            }
            parts
        };

        trace!(trigger_id = %trigger_id, "Invoking event callback");
        let result = catch_unwind(AssertUnwindSafe(|| translator(&*origin, &*callback)));

        // May run the origin's destructor, which removes this slot.
        drop(origin);
        drop(callback);

        {
            let mut state = self.state.lock();
            if let Some(marker) = state.in_flight.get_mut(slot) {
                *marker = None;
            }
        }
        self.idle.notify_all();

        match result {
            Ok(()) => Invocation::Called,
            Err(panic) => {
                warn!(
                    trigger_id = %trigger_id,
                    error = ?panic,
                    "Event callback panicked"
                );
                Invocation::Panicked
            },
        }
    }

    /// Take every record out of the table.
    pub(crate) fn drain(&self) -> Vec<EventRecord> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        while state
            .in_flight
            .iter()
            .any(|marker| marker.is_some_and(|invoker| invoker != me))
        {
            self.idle.wait(&mut state);
        }

        let mut drained = Vec::new();
        for slot in 0..state.records.len() {
            if let Some(record) = state.records.get_mut(slot).and_then(Option::take) {
                drained.push(record);
                state.free.push(slot);
            }
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::NoEvent;
    use crate::trigger::TriggerHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        hits: AtomicUsize,
        invalidated: AtomicUsize,
    }

    impl EventSource for Counter {
        type Event = NoEvent;

        fn enable(&self, _handle: TriggerHandle, _event: Option<NoEvent>) {}

        fn disable(&self, _event: Option<NoEvent>) {}

        fn invalidate(&self, _trigger_id: TriggerId) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn hit(counter: &Counter) {
        counter.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn panic_callback(_counter: &Counter) {
        panic!("callback failure");
    }

    fn key(origin: &Arc<Counter>) -> EventKey {
        EventKey::new(origin, NoEvent::PLACEHOLDER_ID, TypeId::of::<NoEvent>())
    }

    fn record(origin: &Arc<Counter>, callback: fn(&Counter)) -> EventRecord {
        EventRecord::new(origin, key(origin), callback)
    }

    #[test]
    fn test_insert_and_invoke_translates_back() {
        let table = EventTable::new(4);
        let origin = Arc::new(Counter::default());

        let id = table.insert(record(&origin, hit), 1).unwrap();
        assert_eq!(id.slot(), 0);
        assert_eq!(table.len(), 1);

        assert_eq!(table.invoke(id.slot()), Invocation::Called);
        assert_eq!(origin.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_vacant_slot() {
        let table = EventTable::new(2);
        assert_eq!(table.invoke(0), Invocation::Vacant);
        assert_eq!(table.invoke(7), Invocation::Vacant);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let table = EventTable::new(4);
        let origin = Arc::new(Counter::default());

        table.insert(record(&origin, hit), 1).unwrap();
        let err = table.insert(record(&origin, hit), 2).unwrap_err();
        assert_eq!(err, AttachError::AlreadyAttached { event_id: 0 });
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_capacity_exhausted() {
        let table = EventTable::new(1);
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());

        table.insert(record(&first, hit), 1).unwrap();
        let err = table.insert(record(&second, hit), 2).unwrap_err();
        assert_eq!(err, AttachError::CapacityExhausted { capacity: 1 });
    }

    #[test]
    fn test_remove_then_invoke_is_noop() {
        let table = EventTable::new(2);
        let origin = Arc::new(Counter::default());

        let id = table.insert(record(&origin, hit), 1).unwrap();
        assert!(table.remove(id).is_some());
        assert_eq!(table.invoke(id.slot()), Invocation::Vacant);
        assert_eq!(origin.hits.load(Ordering::SeqCst), 0);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_stale_trigger_id_does_not_remove_reused_slot() {
        let table = EventTable::new(1);
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());

        let stale = table.insert(record(&first, hit), 1).unwrap();
        table.remove(stale);
        let fresh = table.insert(record(&second, hit), 2).unwrap();
        assert_eq!(stale.slot(), fresh.slot());

        assert!(table.remove(stale).is_none());
        assert_eq!(table.invoke(fresh.slot()), Invocation::Called);
        assert_eq!(second.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_origin_is_not_invoked() {
        let table = EventTable::new(2);
        let origin = Arc::new(Counter::default());
        let id = table.insert(record(&origin, hit), 1).unwrap();

        drop(origin);
        assert_eq!(table.invoke(id.slot()), Invocation::Vacant);
    }

    #[test]
    fn test_dead_origin_does_not_block_new_attach() {
        let table = EventTable::new(2);
        let origin = Arc::new(Counter::default());
        let key = key(&origin);
        table.insert(record(&origin, hit), 1).unwrap();

        drop(origin);
        assert!(!table.contains(&key));
    }

    #[test]
    fn test_panicking_callback_is_contained() {
        let table = EventTable::new(2);
        let origin = Arc::new(Counter::default());
        let id = table.insert(record(&origin, panic_callback), 1).unwrap();

        assert_eq!(table.invoke(id.slot()), Invocation::Panicked);
        // The slot is not left marked as in flight.
        assert!(table.remove(id).is_some());
    }

    #[test]
    fn test_signal_only_for_current_occupant() {
        let table = EventTable::new(1);
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());

        let stale = table.insert(record(&first, hit), 1).unwrap();
        assert!(table.signal(stale, || true));
        table.remove(stale);
        assert!(!table.signal(stale, || true));

        let fresh = table.insert(record(&second, hit), 2).unwrap();
        assert!(!table.signal(stale, || panic!("stale id must not notify")));
        assert!(table.signal(fresh, || true));
    }

    #[test]
    fn test_remove_key() {
        let table = EventTable::new(2);
        let origin = Arc::new(Counter::default());
        table.insert(record(&origin, hit), 1).unwrap();

        assert!(table.remove_key(&key(&origin)).is_some());
        assert!(table.remove_key(&key(&origin)).is_none());
    }

    #[test]
    fn test_drain_and_invalidate() {
        let table = EventTable::new(4);
        let first = Arc::new(Counter::default());
        let second = Arc::new(Counter::default());
        table.insert(record(&first, hit), 1).unwrap();
        table.insert(record(&second, hit), 2).unwrap();

        let drained = table.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(table.len(), 0);

        for record in &drained {
            record.invalidate_origin();
        }
        assert_eq!(first.invalidated.load(Ordering::SeqCst), 1);
        assert_eq!(second.invalidated.load(Ordering::SeqCst), 1);
    }
}
