//! Mock event sources for testing.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use portier_events::{EventSource, EventType, NoEvent, TriggerHandle, TriggerId};

/// Callback counter that tests can block on.
#[derive(Debug, Default)]
pub struct HitCounter {
    hits: Mutex<usize>,
    changed: Condvar,
}

impl HitCounter {
    /// Count one hit and wake waiters.
    pub fn record(&self) {
        let mut hits = self.hits.lock();
        *hits = hits.saturating_add(1);
        self.changed.notify_all();
    }

    /// Current number of hits.
    #[must_use]
    pub fn get(&self) -> usize {
        *self.hits.lock()
    }

    /// Block until at least `expected` hits were counted or `timeout`
    /// elapsed. Returns whether the count was reached.
    #[must_use]
    pub fn wait_for(&self, expected: usize, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut hits = self.hits.lock();
        while *hits < expected {
            let timed_out = match deadline {
                Some(deadline) => self.changed.wait_until(&mut hits, deadline).timed_out(),
                None => {
                    self.changed.wait(&mut hits);
                    false
                },
            };
            if timed_out {
                return *hits >= expected;
            }
        }
        true
    }
}

/// Origin with a single default event, like a user-defined trigger.
///
/// Attach it with [`MockTrigger::on_trigger`] (or one of the other
/// callbacks) and fire it with [`MockTrigger::trigger`].
#[derive(Debug, Default)]
pub struct MockTrigger {
    handle: Mutex<Option<TriggerHandle>>,
    hits: HitCounter,
    running: AtomicUsize,
    enabled: AtomicUsize,
    disabled: AtomicUsize,
    invalidated: AtomicUsize,
    delay: Duration,
}

impl MockTrigger {
    /// Create a mock trigger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every callback sleep for `delay` before counting the hit.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Callback counting the hit.
    pub fn on_trigger(trigger: &Self) {
        trigger.running.fetch_add(1, Ordering::SeqCst);
        if !trigger.delay.is_zero() {
            thread::sleep(trigger.delay);
        }
        trigger.hits.record();
        trigger.running.fetch_sub(1, Ordering::SeqCst);
    }

    /// Callback counting the hit and then detaching itself.
    pub fn on_trigger_detach(trigger: &Self) {
        Self::on_trigger(trigger);
        trigger.disable(None);
    }

    /// Callback that panics.
    ///
    /// # Panics
    ///
    /// Always.
    pub fn on_trigger_panic(trigger: &Self) {
        trigger.hits.record();
        panic!("mock trigger callback panicked");
    }

    /// Signal the event. Returns `false` if the trigger is not armed.
    pub fn trigger(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(TriggerHandle::trigger)
    }

    /// Whether the trigger holds a valid handle.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(TriggerHandle::is_valid)
    }

    /// Id of the held handle.
    #[must_use]
    pub fn trigger_id(&self) -> Option<TriggerId> {
        self.handle.lock().as_ref().map(TriggerHandle::id)
    }

    /// Completed callbacks.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    /// Block until `expected` callbacks completed or `timeout` elapsed.
    #[must_use]
    pub fn wait_for_hits(&self, expected: usize, timeout: Duration) -> bool {
        self.hits.wait_for(expected, timeout)
    }

    /// Callbacks currently running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of `enable` calls received.
    #[must_use]
    pub fn enabled_count(&self) -> usize {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Number of `disable` calls received.
    #[must_use]
    pub fn disabled_count(&self) -> usize {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Number of `invalidate` calls received.
    #[must_use]
    pub fn invalidated_count(&self) -> usize {
        self.invalidated.load(Ordering::SeqCst)
    }
}

impl EventSource for MockTrigger {
    type Event = NoEvent;

    fn enable(&self, handle: TriggerHandle, _event: Option<NoEvent>) {
        self.enabled.fetch_add(1, Ordering::SeqCst);
        let previous = self.handle.lock().replace(handle);
        drop(previous);
    }

    fn disable(&self, _event: Option<NoEvent>) {
        self.disabled.fetch_add(1, Ordering::SeqCst);
        // Reset outside the lock: the reset may wait for a running callback.
        let handle = self.handle.lock().take();
        drop(handle);
    }

    fn invalidate(&self, trigger_id: TriggerId) {
        self.invalidated.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self
            .handle
            .lock()
            .as_mut()
            .filter(|handle| handle.matches(trigger_id))
        {
            handle.invalidate();
        }
    }
}

/// Events raised by [`MockSubscriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriberEvent {
    /// New data arrived.
    DataReceived,
    /// The publisher went away.
    Unsubscribed,
}

impl SubscriberEvent {
    /// Every event, in handle order.
    pub const ALL: [Self; 2] = [Self::DataReceived, Self::Unsubscribed];

    fn index(self) -> usize {
        match self {
            Self::DataReceived => 0,
            Self::Unsubscribed => 1,
        }
    }
}

impl EventType for SubscriberEvent {
    fn event_id(self) -> u64 {
        match self {
            Self::DataReceived => 1,
            Self::Unsubscribed => 2,
        }
    }
}

/// Origin raising several events, like a subscriber.
///
/// Attached without an event, it raises [`SubscriberEvent::DataReceived`].
#[derive(Debug, Default)]
pub struct MockSubscriber {
    handles: Mutex<[Option<TriggerHandle>; 2]>,
    data_received: HitCounter,
    unsubscribed: HitCounter,
}

impl MockSubscriber {
    /// Create a mock subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback for [`SubscriberEvent::DataReceived`].
    pub fn on_data_received(subscriber: &Self) {
        subscriber.data_received.record();
    }

    /// Callback for [`SubscriberEvent::Unsubscribed`].
    pub fn on_unsubscribed(subscriber: &Self) {
        subscriber.unsubscribed.record();
    }

    /// Signal `event`. Returns `false` if it is not armed.
    pub fn trigger(&self, event: SubscriberEvent) -> bool {
        self.handles
            .lock()
            .get(event.index())
            .and_then(Option::as_ref)
            .is_some_and(TriggerHandle::trigger)
    }

    /// Whether `event` holds a valid handle.
    #[must_use]
    pub fn is_armed(&self, event: SubscriberEvent) -> bool {
        self.handles
            .lock()
            .get(event.index())
            .and_then(Option::as_ref)
            .is_some_and(TriggerHandle::is_valid)
    }

    /// Completed callbacks of [`SubscriberEvent::DataReceived`].
    #[must_use]
    pub fn data_received(&self) -> usize {
        self.data_received.get()
    }

    /// Completed callbacks of [`SubscriberEvent::Unsubscribed`].
    #[must_use]
    pub fn unsubscribed(&self) -> usize {
        self.unsubscribed.get()
    }

    /// Block until `expected` data callbacks completed or `timeout` elapsed.
    #[must_use]
    pub fn wait_for_data(&self, expected: usize, timeout: Duration) -> bool {
        self.data_received.wait_for(expected, timeout)
    }

    fn slot(event: Option<SubscriberEvent>) -> usize {
        event.unwrap_or(SubscriberEvent::DataReceived).index()
    }
}

impl EventSource for MockSubscriber {
    type Event = SubscriberEvent;

    fn enable(&self, handle: TriggerHandle, event: Option<SubscriberEvent>) {
        let previous = self
            .handles
            .lock()
            .get_mut(Self::slot(event))
            .and_then(|slot| slot.replace(handle));
        drop(previous);
    }

    fn disable(&self, event: Option<SubscriberEvent>) {
        let handle = self
            .handles
            .lock()
            .get_mut(Self::slot(event))
            .and_then(Option::take);
        drop(handle);
    }

    fn invalidate(&self, trigger_id: TriggerId) {
        for handle in self.handles.lock().iter_mut().flatten() {
            if handle.matches(trigger_id) {
                handle.invalidate();
            }
        }
    }
}
