//! Event multiplexer: one dispatch point for many event origins.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::error::{AttachError, AttachResult, MultiplexerResult};
use crate::source::{EventSource, EventType, NoEvent, TriggerId};
use crate::table::{EventKey, EventRecord, EventTable, Invocation};
use crate::trigger::{TriggerHandle, next_unique_id};
use crate::variable::EventVariable;

/// Default number of events a multiplexer can hold.
pub const DEFAULT_MULTIPLEXER_CAPACITY: usize = 256;

/// Default name of the background dispatch thread.
pub const DEFAULT_DISPATCH_THREAD_NAME: &str = "portier-dispatch";

/// Construction options for [`EventMultiplexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexerOptions {
    /// Maximum number of simultaneously attached events.
    pub capacity: usize,
    /// Run callbacks on a thread owned by the multiplexer.
    pub background_dispatch: bool,
    /// Name of the dispatch thread.
    pub thread_name: String,
}

impl Default for MultiplexerOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MULTIPLEXER_CAPACITY,
            background_dispatch: true,
            thread_name: DEFAULT_DISPATCH_THREAD_NAME.to_string(),
        }
    }
}

impl MultiplexerOptions {
    /// Set the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enable or disable the background dispatch thread.
    #[must_use]
    pub fn with_background_dispatch(mut self, enabled: bool) -> Self {
        self.background_dispatch = enabled;
        self
    }

    /// Set the dispatch thread name.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[cfg(feature = "config")]
impl From<&portier_config::MultiplexerSection> for MultiplexerOptions {
    fn from(section: &portier_config::MultiplexerSection) -> Self {
        Self {
            capacity: section.capacity,
            background_dispatch: section.background_dispatch,
            thread_name: section.thread_name.clone(),
        }
    }
}

/// State shared between the multiplexer, its dispatch thread and the
/// trigger handles (weakly).
#[derive(Debug)]
pub(crate) struct Shared {
    table: EventTable,
    variable: EventVariable,
}

impl Shared {
    /// Removal path of [`TriggerHandle::reset`].
    pub(crate) fn remove_trigger(&self, trigger_id: TriggerId) {
        if let Some(record) = self.table.remove(trigger_id) {
            self.variable.reset(trigger_id.slot());
            debug!(trigger_id = %trigger_id, "Event detached");
            drop(record);
        }
    }

    /// Signalling path of [`TriggerHandle::trigger`].
    pub(crate) fn signal(&self, trigger_id: TriggerId) -> bool {
        self.table
            .signal(trigger_id, || self.variable.notify(trigger_id.slot()))
    }

    fn invoke(&self, slot: usize) -> bool {
        self.table.invoke(slot) != Invocation::Vacant
    }

    fn dispatch(&self, fired: &mut Vec<usize>) -> usize {
        let mut invoked = 0usize;
        for slot in fired.drain(..) {
            if self.invoke(slot) {
                invoked = invoked.saturating_add(1);
            }
        }
        invoked
    }
}

fn dispatch_loop(shared: &Shared) {
    let mut fired = Vec::with_capacity(shared.table.capacity());
    while shared.variable.wait(&mut fired) {
        shared.dispatch(&mut fired);
    }
    debug!("Dispatch loop stopped");
}

/// Registers callbacks on event origins and invokes them when the origins
/// trigger.
///
/// An origin is any [`EventSource`] shared as `Arc<T>`. Attaching stores a
/// type-erased record holding the origin weakly and hands the origin a
/// [`TriggerHandle`]. Triggering the handle marks the record's slot as fired;
/// the dispatcher then calls the callback with the origin.
///
/// Guarantees:
/// - after `detach` (or the handle's reset) returns, the callback is not
///   running on another thread and will not run again;
/// - a dropped origin is never invoked;
/// - dropping the multiplexer invalidates every still-attached origin.
///
/// # Example
///
/// ```
/// use parking_lot::Mutex;
/// use portier_events::{EventMultiplexer, EventSource, NoEvent, TriggerHandle, TriggerId};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct Doorbell {
///     handle: Mutex<Option<TriggerHandle>>,
///     rings: AtomicUsize,
/// }
///
/// impl EventSource for Doorbell {
///     type Event = NoEvent;
///
///     fn enable(&self, handle: TriggerHandle, _event: Option<NoEvent>) {
///         *self.handle.lock() = Some(handle);
///     }
///
///     fn disable(&self, _event: Option<NoEvent>) {
///         let handle = self.handle.lock().take();
///         drop(handle);
///     }
///
///     fn invalidate(&self, _trigger_id: TriggerId) {
///         if let Some(handle) = self.handle.lock().as_mut() {
///             handle.invalidate();
///         }
///     }
/// }
///
/// let multiplexer = EventMultiplexer::manual(8);
/// let doorbell = Arc::new(Doorbell::default());
/// multiplexer
///     .attach(&doorbell, |bell: &Doorbell| {
///         bell.rings.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// doorbell.handle.lock().as_ref().unwrap().trigger();
/// assert_eq!(multiplexer.dispatch_pending(), 1);
/// assert_eq!(doorbell.rings.load(Ordering::SeqCst), 1);
/// ```
pub struct EventMultiplexer {
    shared: Arc<Shared>,
    dispatcher: Option<JoinHandle<()>>,
}

impl EventMultiplexer {
    /// Create a multiplexer with the default capacity and a background
    /// dispatch thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatch thread cannot be spawned.
    pub fn new() -> MultiplexerResult<Self> {
        Self::from_options(MultiplexerOptions::default())
    }

    /// Create a multiplexer with `capacity` slots and a background dispatch
    /// thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatch thread cannot be spawned.
    pub fn with_capacity(capacity: usize) -> MultiplexerResult<Self> {
        Self::from_options(MultiplexerOptions::default().with_capacity(capacity))
    }

    /// Create a multiplexer without a dispatch thread. The caller drives
    /// dispatch with [`EventMultiplexer::dispatch_pending`] or
    /// [`EventMultiplexer::wait_and_dispatch`].
    #[must_use]
    pub fn manual(capacity: usize) -> Self {
        let multiplexer = Self {
            shared: Self::shared(capacity),
            dispatcher: None,
        };
        debug!(capacity, "Event multiplexer created without dispatch thread");
        multiplexer
    }

    /// Create a multiplexer from `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatch thread cannot be spawned.
    pub fn from_options(options: MultiplexerOptions) -> MultiplexerResult<Self> {
        if !options.background_dispatch {
            return Ok(Self::manual(options.capacity));
        }

        let shared = Self::shared(options.capacity);
        let worker = Arc::clone(&shared);
        let dispatcher = thread::Builder::new()
            .name(options.thread_name.clone())
            .spawn(move || dispatch_loop(&worker))?;

        debug!(
            capacity = options.capacity,
            thread = %options.thread_name,
            "Event multiplexer created"
        );
        Ok(Self {
            shared,
            dispatcher: Some(dispatcher),
        })
    }

    fn shared(capacity: usize) -> Arc<Shared> {
        Arc::new(Shared {
            table: EventTable::new(capacity),
            variable: EventVariable::new(capacity),
        })
    }

    /// Attach the single default event of `origin`.
    ///
    /// # Errors
    ///
    /// See [`EventMultiplexer::attach_with`].
    pub fn attach<T: EventSource>(
        &self,
        origin: &Arc<T>,
        callback: fn(&T),
    ) -> AttachResult<TriggerId> {
        self.attach_with(origin, None, callback)
    }

    /// Attach `event` of `origin`.
    ///
    /// # Errors
    ///
    /// See [`EventMultiplexer::attach_with`].
    pub fn attach_event<T: EventSource>(
        &self,
        origin: &Arc<T>,
        event: T::Event,
        callback: fn(&T),
    ) -> AttachResult<TriggerId> {
        self.attach_with(origin, Some(event), callback)
    }

    /// Attach `event` of `origin` (`None` for the origin's single default
    /// event) and hand the origin its [`TriggerHandle`] through
    /// [`EventSource::enable`].
    ///
    /// On failure nothing is stored and `enable` is not called.
    ///
    /// # Errors
    ///
    /// - [`AttachError::CapacityExhausted`] if every slot is in use
    /// - [`AttachError::AlreadyAttached`] if the same event of the same origin
    ///   is already attached
    pub fn attach_with<T: EventSource>(
        &self,
        origin: &Arc<T>,
        event: Option<T::Event>,
        callback: fn(&T),
    ) -> AttachResult<TriggerId> {
        let key = Self::key(origin, event);
        let record = EventRecord::new(origin, key, callback);

        let trigger_id = match self.shared.table.insert(record, next_unique_id()) {
            Ok(id) => id,
            Err(err) => {
                if matches!(err, AttachError::CapacityExhausted { .. }) {
                    warn!(
                        capacity = self.capacity(),
                        event_id = key.event_id,
                        "Event multiplexer full, attach rejected"
                    );
                }
                return Err(err);
            },
        };
        // A notification left over from the slot's previous occupant.
        self.shared.variable.reset(trigger_id.slot());

        let handle = TriggerHandle::new(Arc::downgrade(&self.shared), trigger_id);
        debug!(
            trigger_id = %trigger_id,
            event_id = key.event_id,
            "Event attached"
        );
        origin.enable(handle, event);
        Ok(trigger_id)
    }

    /// Detach the single default event of `origin`.
    pub fn detach<T: EventSource>(&self, origin: &Arc<T>) {
        self.detach_with(origin, None);
    }

    /// Detach `event` of `origin`.
    pub fn detach_event<T: EventSource>(&self, origin: &Arc<T>, event: T::Event) {
        self.detach_with(origin, Some(event));
    }

    /// Detach `event` of `origin` through [`EventSource::disable`].
    ///
    /// A no-op when the event is not attached to this multiplexer; `disable`
    /// is then not called, so an attachment of the same origin on another
    /// multiplexer is left alone. If the callback is running on another
    /// thread, waits for it to return.
    ///
    /// A record the origin did not remove through its handle is removed here
    /// and the origin is told to invalidate that handle.
    pub fn detach_with<T: EventSource>(&self, origin: &Arc<T>, event: Option<T::Event>) {
        let key = Self::key(origin, event);
        if !self.shared.table.contains(&key) {
            trace!(event_id = key.event_id, "Detach of unattached event ignored");
            return;
        }

        origin.disable(event);

        if let Some(record) = self.shared.table.remove_key(&key) {
            let trigger_id = record.trigger_id();
            self.shared.variable.reset(trigger_id.slot());
            record.invalidate_origin();
            debug!(
                trigger_id = %trigger_id,
                event_id = record.key().event_id,
                "Event detached without handle reset"
            );
        }
    }

    /// Whether `event` of `origin` is attached.
    #[must_use]
    pub fn is_attached<T: EventSource>(&self, origin: &Arc<T>, event: Option<T::Event>) -> bool {
        self.shared.table.contains(&Self::key(origin, event))
    }

    /// Run the callback attached in `slot`.
    ///
    /// Returns `false` if the slot is empty or its origin was dropped.
    pub fn invoke(&self, slot: usize) -> bool {
        self.shared.invoke(slot)
    }

    /// Invoke every slot fired since the last dispatch without blocking.
    ///
    /// Returns the number of callbacks run.
    pub fn dispatch_pending(&self) -> usize {
        let mut fired = Vec::new();
        self.shared.variable.try_take(&mut fired);
        self.shared.dispatch(&mut fired)
    }

    /// Block until an attached event fires, then invoke every fired slot.
    ///
    /// Meant for multiplexers created without a dispatch thread. Returns `0`
    /// once the multiplexer is shutting down.
    pub fn wait_and_dispatch(&self) -> usize {
        let mut fired = Vec::new();
        if !self.shared.variable.wait(&mut fired) {
            return 0;
        }
        self.shared.dispatch(&mut fired)
    }

    /// Like [`EventMultiplexer::wait_and_dispatch`] but gives up after
    /// `timeout`.
    pub fn wait_and_dispatch_timeout(&self, timeout: Duration) -> usize {
        let mut fired = Vec::new();
        if !self.shared.variable.wait_timeout(&mut fired, timeout) {
            return 0;
        }
        self.shared.dispatch(&mut fired)
    }

    /// Maximum number of simultaneously attached events.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.table.capacity()
    }

    /// Number of attached events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.table.len()
    }

    /// Whether no event is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a background dispatch thread is running.
    #[must_use]
    pub fn has_dispatch_thread(&self) -> bool {
        self.dispatcher.is_some()
    }

    fn key<T: EventSource>(origin: &Arc<T>, event: Option<T::Event>) -> EventKey {
        match event {
            Some(event) => EventKey::new(origin, event.event_id(), TypeId::of::<T::Event>()),
            None => EventKey::new(origin, NoEvent::PLACEHOLDER_ID, TypeId::of::<NoEvent>()),
        }
    }
}

impl fmt::Debug for EventMultiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventMultiplexer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("dispatch_thread", &self.has_dispatch_thread())
            .finish()
    }
}

impl Drop for EventMultiplexer {
    fn drop(&mut self) {
        self.shared.variable.destroy();

        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.thread().id() == thread::current().id() {
                // Dropped from one of its own callbacks; the loop exits once
                // the callback returns.
                trace!("Event multiplexer dropped on its dispatch thread");
            } else if dispatcher.join().is_err() {
                warn!("Dispatch thread panicked");
            }
        }

        let records = self.shared.table.drain();
        for record in &records {
            record.invalidate_origin();
        }
        debug!(invalidated = records.len(), "Event multiplexer dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[derive(Default)]
    struct Trigger {
        handle: Mutex<Option<TriggerHandle>>,
        hits: AtomicUsize,
        enabled: AtomicUsize,
        invalidated: AtomicUsize,
        sender: Mutex<Option<mpsc::Sender<usize>>>,
    }

    impl Trigger {
        fn fire(&self) -> bool {
            self.handle.lock().as_ref().is_some_and(TriggerHandle::trigger)
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    impl EventSource for Trigger {
        type Event = NoEvent;

        fn enable(&self, handle: TriggerHandle, _event: Option<NoEvent>) {
            self.enabled.fetch_add(1, Ordering::SeqCst);
            *self.handle.lock() = Some(handle);
        }

        fn disable(&self, _event: Option<NoEvent>) {
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

    fn count(trigger: &Trigger) {
        trigger.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn count_and_report(trigger: &Trigger) {
        let hits = trigger.hits.fetch_add(1, Ordering::SeqCst);
        if let Some(sender) = trigger.sender.lock().as_ref() {
            let _ = sender.send(hits);
        }
    }

    fn detach_self(trigger: &Trigger) {
        trigger.hits.fetch_add(1, Ordering::SeqCst);
        trigger.disable(None);
    }

    fn explode(_trigger: &Trigger) {
        panic!("callback failure");
    }

    #[derive(Debug, Clone, Copy)]
    enum SubscriberEvent {
        DataReceived = 0,
        Unsubscribed = 1,
    }

    impl EventType for SubscriberEvent {
        fn event_id(self) -> u64 {
            self as u64
        }
    }

    #[derive(Default)]
    struct Subscriber {
        handles: Mutex<[Option<TriggerHandle>; 2]>,
        data: AtomicUsize,
        unsubscribed: AtomicUsize,
    }

    impl Subscriber {
        fn fire(&self, event: SubscriberEvent) -> bool {
            self.handles.lock()[event as usize]
                .as_ref()
                .is_some_and(TriggerHandle::trigger)
        }
    }

    impl EventSource for Subscriber {
        type Event = SubscriberEvent;

        fn enable(&self, handle: TriggerHandle, event: Option<SubscriberEvent>) {
            let index = event.map_or(0, |event| event as usize);
            self.handles.lock()[index] = Some(handle);
        }

        fn disable(&self, event: Option<SubscriberEvent>) {
            let index = event.map_or(0, |event| event as usize);
            let handle = self.handles.lock()[index].take();
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

    /// Keeps its handle armed through `disable` and `invalidate`.
    #[derive(Default)]
    struct Sticky {
        handle: Mutex<Option<TriggerHandle>>,
        hits: AtomicUsize,
        invalidated: AtomicUsize,
    }

    impl Sticky {
        fn fire(&self) -> bool {
            self.handle.lock().as_ref().is_some_and(TriggerHandle::trigger)
        }
    }

    impl EventSource for Sticky {
        type Event = NoEvent;

        fn enable(&self, handle: TriggerHandle, _event: Option<NoEvent>) {
            let previous = self.handle.lock().replace(handle);
            drop(previous);
        }

        fn disable(&self, _event: Option<NoEvent>) {}

        fn invalidate(&self, _trigger_id: TriggerId) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn count_sticky(sticky: &Sticky) {
        sticky.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// Announces `enable` and waits for permission before storing the handle.
    struct Gated {
        handle: Mutex<Option<TriggerHandle>>,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        proceed: Mutex<Option<mpsc::Receiver<()>>>,
        hits: AtomicUsize,
    }

    impl Gated {
        fn new(entered: mpsc::Sender<()>, proceed: mpsc::Receiver<()>) -> Self {
            Self {
                handle: Mutex::new(None),
                entered: Mutex::new(Some(entered)),
                proceed: Mutex::new(Some(proceed)),
                hits: AtomicUsize::new(0),
            }
        }

        fn fire(&self) -> bool {
            self.handle.lock().as_ref().is_some_and(TriggerHandle::trigger)
        }
    }

    impl EventSource for Gated {
        type Event = NoEvent;

        fn enable(&self, handle: TriggerHandle, _event: Option<NoEvent>) {
            let entered = self.entered.lock().take();
            if let Some(entered) = entered {
                let _ = entered.send(());
            }
            let proceed = self.proceed.lock().take();
            if let Some(proceed) = proceed {
                let _ = proceed.recv();
            }
            let previous = self.handle.lock().replace(handle);
            drop(previous);
        }

        fn disable(&self, _event: Option<NoEvent>) {
            let handle = self.handle.lock().take();
            drop(handle);
        }

        fn invalidate(&self, trigger_id: TriggerId) {
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

    fn count_gated(gated: &Gated) {
        gated.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn on_data(subscriber: &Subscriber) {
        subscriber.data.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unsubscribed(subscriber: &Subscriber) {
        subscriber.unsubscribed.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_options_builders() {
        let options = MultiplexerOptions::default()
            .with_capacity(16)
            .with_background_dispatch(false)
            .with_thread_name("dispatch-test");
        assert_eq!(options.capacity, 16);
        assert!(!options.background_dispatch);
        assert_eq!(options.thread_name, "dispatch-test");

        let multiplexer = EventMultiplexer::from_options(options).unwrap();
        assert_eq!(multiplexer.capacity(), 16);
        assert!(!multiplexer.has_dispatch_thread());
    }

    #[test]
    fn test_default_capacity() {
        let multiplexer = EventMultiplexer::new().unwrap();
        assert_eq!(multiplexer.capacity(), DEFAULT_MULTIPLEXER_CAPACITY);
        assert!(multiplexer.has_dispatch_thread());
        assert!(multiplexer.is_empty());
    }

    #[test]
    fn test_single_signal_single_call() {
        let multiplexer = EventMultiplexer::manual(4);
        let trigger = Arc::new(Trigger::default());

        multiplexer.attach(&trigger, count).unwrap();
        assert_eq!(trigger.enabled.load(Ordering::SeqCst), 1);
        assert!(multiplexer.is_attached(&trigger, None));

        assert!(trigger.fire());
        assert_eq!(multiplexer.dispatch_pending(), 1);
        assert_eq!(trigger.hits(), 1);

        assert_eq!(multiplexer.dispatch_pending(), 0);
        assert_eq!(trigger.hits(), 1);
    }

    #[test]
    fn test_detach_before_signal_means_no_call() {
        let multiplexer = EventMultiplexer::manual(4);
        let trigger = Arc::new(Trigger::default());

        multiplexer.attach(&trigger, count).unwrap();
        multiplexer.detach(&trigger);

        assert!(!trigger.fire());
        assert_eq!(multiplexer.dispatch_pending(), 0);
        assert_eq!(trigger.hits(), 0);
        assert!(multiplexer.is_empty());
    }

    #[test]
    fn test_pending_signal_dropped_on_detach() {
        let multiplexer = EventMultiplexer::manual(4);
        let trigger = Arc::new(Trigger::default());

        multiplexer.attach(&trigger, count).unwrap();
        assert!(trigger.fire());
        multiplexer.detach(&trigger);

        assert_eq!(multiplexer.dispatch_pending(), 0);
        assert_eq!(trigger.hits(), 0);
    }

    #[test]
    fn test_duplicate_attach_rejected() {
        let multiplexer = EventMultiplexer::manual(4);
        let trigger = Arc::new(Trigger::default());

        multiplexer.attach(&trigger, count).unwrap();
        let err = multiplexer.attach(&trigger, count).unwrap_err();
        assert_eq!(err, AttachError::AlreadyAttached { event_id: 0 });
        assert_eq!(trigger.enabled.load(Ordering::SeqCst), 1);
        assert_eq!(multiplexer.len(), 1);
    }

    #[test]
    fn test_capacity_exhausted_does_not_enable() {
        let multiplexer = EventMultiplexer::manual(1);
        let first = Arc::new(Trigger::default());
        let second = Arc::new(Trigger::default());

        multiplexer.attach(&first, count).unwrap();
        let err = multiplexer.attach(&second, count).unwrap_err();
        assert_eq!(err, AttachError::CapacityExhausted { capacity: 1 });
        assert_eq!(second.enabled.load(Ordering::SeqCst), 0);
        assert!(second.handle.lock().is_none());
    }

    #[test]
    fn test_slot_reused_after_detach() {
        let multiplexer = EventMultiplexer::manual(1);
        let first = Arc::new(Trigger::default());
        let second = Arc::new(Trigger::default());

        let first_id = multiplexer.attach(&first, count).unwrap();
        multiplexer.detach(&first);
        let second_id = multiplexer.attach(&second, count).unwrap();

        assert_eq!(first_id.slot(), second_id.slot());
        assert_ne!(first_id, second_id);

        assert!(second.fire());
        assert_eq!(multiplexer.dispatch_pending(), 1);
        assert_eq!(first.hits(), 0);
        assert_eq!(second.hits(), 1);
    }

    #[test]
    fn test_detach_unattached_is_noop() {
        let multiplexer = EventMultiplexer::manual(2);
        let trigger = Arc::new(Trigger::default());
        multiplexer.detach(&trigger);
        assert!(multiplexer.is_empty());
    }

    #[test]
    fn test_dropped_origin_is_detached() {
        let multiplexer = EventMultiplexer::manual(2);
        let trigger = Arc::new(Trigger::default());
        let id = multiplexer.attach(&trigger, count).unwrap();

        drop(trigger);
        assert!(multiplexer.is_empty());
        assert!(!multiplexer.invoke(id.slot()));
    }

    #[test]
    fn test_callback_detaching_itself() {
        let multiplexer = EventMultiplexer::manual(2);
        let trigger = Arc::new(Trigger::default());
        multiplexer.attach(&trigger, detach_self).unwrap();

        assert!(trigger.fire());
        assert_eq!(multiplexer.dispatch_pending(), 1);
        assert_eq!(trigger.hits(), 1);
        assert!(multiplexer.is_empty());
        assert!(!trigger.fire());
    }

    #[test]
    fn test_panicking_callback_does_not_block_detach() {
        let multiplexer = EventMultiplexer::manual(2);
        let trigger = Arc::new(Trigger::default());
        multiplexer.attach(&trigger, explode).unwrap();

        assert!(trigger.fire());
        assert_eq!(multiplexer.dispatch_pending(), 1);

        multiplexer.detach(&trigger);
        assert!(multiplexer.is_empty());
    }

    #[test]
    fn test_drop_invalidates_origins() {
        let multiplexer = EventMultiplexer::manual(4);
        let trigger = Arc::new(Trigger::default());
        multiplexer.attach(&trigger, count).unwrap();

        drop(multiplexer);
        assert_eq!(trigger.invalidated.load(Ordering::SeqCst), 1);
        assert!(!trigger.fire());
        assert!(
            !trigger
                .handle
                .lock()
                .as_ref()
                .is_some_and(TriggerHandle::is_valid)
        );
    }

    #[test]
    fn test_events_of_one_origin_are_independent() {
        let multiplexer = EventMultiplexer::manual(4);
        let subscriber = Arc::new(Subscriber::default());

        multiplexer
            .attach_event(&subscriber, SubscriberEvent::DataReceived, on_data)
            .unwrap();
        multiplexer
            .attach_event(&subscriber, SubscriberEvent::Unsubscribed, on_unsubscribed)
            .unwrap();
        assert_eq!(multiplexer.len(), 2);

        assert!(subscriber.fire(SubscriberEvent::DataReceived));
        assert!(subscriber.fire(SubscriberEvent::DataReceived));
        assert_eq!(multiplexer.dispatch_pending(), 1);
        assert_eq!(subscriber.data.load(Ordering::SeqCst), 1);
        assert_eq!(subscriber.unsubscribed.load(Ordering::SeqCst), 0);

        multiplexer.detach_event(&subscriber, SubscriberEvent::DataReceived);
        assert!(!multiplexer.is_attached(&subscriber, Some(SubscriberEvent::DataReceived)));
        assert!(multiplexer.is_attached(&subscriber, Some(SubscriberEvent::Unsubscribed)));

        assert!(subscriber.fire(SubscriberEvent::Unsubscribed));
        assert_eq!(multiplexer.dispatch_pending(), 1);
        assert_eq!(subscriber.unsubscribed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_background_dispatch() {
        let multiplexer = EventMultiplexer::with_capacity(4).unwrap();
        let trigger = Arc::new(Trigger::default());
        let (sender, receiver) = mpsc::channel();
        *trigger.sender.lock() = Some(sender);

        multiplexer.attach(&trigger, count_and_report).unwrap();
        assert!(trigger.fire());

        let seen = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seen, 0);

        multiplexer.detach(&trigger);
        assert!(multiplexer.is_empty());
    }

    #[test]
    fn test_wait_and_dispatch_timeout() {
        let multiplexer = EventMultiplexer::manual(2);
        let trigger = Arc::new(Trigger::default());
        multiplexer.attach(&trigger, count).unwrap();

        assert_eq!(
            multiplexer.wait_and_dispatch_timeout(Duration::from_millis(10)),
            0
        );
        assert!(trigger.fire());
        assert_eq!(
            multiplexer.wait_and_dispatch_timeout(Duration::from_secs(5)),
            1
        );
        assert_eq!(trigger.hits(), 1);
    }

    #[test]
    fn test_kept_handle_does_not_fire_next_occupant() {
        let multiplexer = EventMultiplexer::manual(1);
        let first = Arc::new(Sticky::default());
        let second = Arc::new(Sticky::default());

        multiplexer.attach(&first, count_sticky).unwrap();
        multiplexer.detach(&first);
        assert!(multiplexer.is_empty());
        assert_eq!(first.invalidated.load(Ordering::SeqCst), 1);

        multiplexer.attach(&second, count_sticky).unwrap();
        assert!(!first.fire());
        assert_eq!(multiplexer.dispatch_pending(), 0);
        assert_eq!(second.hits.load(Ordering::SeqCst), 0);

        assert!(second.fire());
        assert_eq!(multiplexer.dispatch_pending(), 1);
        assert_eq!(second.hits.load(Ordering::SeqCst), 1);
        assert_eq!(first.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detach_before_enable_leaves_handle_inert() {
        let multiplexer = Arc::new(EventMultiplexer::manual(1));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (proceed_tx, proceed_rx) = mpsc::channel();
        let gated = Arc::new(Gated::new(entered_tx, proceed_rx));

        let attacher = {
            let multiplexer = Arc::clone(&multiplexer);
            let gated = Arc::clone(&gated);
            thread::spawn(move || multiplexer.attach(&gated, count_gated))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // The record is stored but the origin holds no handle yet.
        multiplexer.detach(&gated);
        assert!(multiplexer.is_empty());
        proceed_tx.send(()).unwrap();
        assert!(attacher.join().unwrap().is_ok());

        let other = Arc::new(Trigger::default());
        multiplexer.attach(&other, count).unwrap();
        assert!(!gated.fire());
        assert_eq!(multiplexer.dispatch_pending(), 0);
        assert_eq!(other.hits(), 0);
        assert_eq!(gated.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_detach_leaves_other_multiplexer_alone() {
        let left = EventMultiplexer::manual(2);
        let right = EventMultiplexer::manual(2);
        let trigger = Arc::new(Trigger::default());
        left.attach(&trigger, count).unwrap();

        right.detach(&trigger);
        assert!(left.is_attached(&trigger, None));
        assert!(trigger.fire());
        assert_eq!(left.dispatch_pending(), 1);
        assert_eq!(trigger.hits(), 1);
    }
}
