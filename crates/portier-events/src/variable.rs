//! Notification object shared by a multiplexer and its trigger handles.

use parking_lot::{Condvar, Mutex};
use std::time::Duration;
use tracing::trace;

#[derive(Debug)]
struct VariableState {
    /// One pending flag per slot.
    fired: Vec<bool>,
    destroyed: bool,
}

impl VariableState {
    fn take_fired(&mut self, out: &mut Vec<usize>) -> usize {
        let before = out.len();
        for (slot, fired) in self.fired.iter_mut().enumerate() {
            if std::mem::take(fired) {
                out.push(slot);
            }
        }
        out.len().saturating_sub(before)
    }
}

/// Set of per-slot "fired" flags with a blocking wait.
///
/// Any number of trigger handles notify; one dispatcher waits. Notifying a
/// slot that is already pending coalesces into one wake-up for that slot.
#[derive(Debug)]
pub struct EventVariable {
    state: Mutex<VariableState>,
    ready: Condvar,
}

impl EventVariable {
    /// Create a variable with one flag per slot.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(VariableState {
                fired: vec![false; capacity],
                destroyed: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().fired.len()
    }

    /// Mark `slot` as fired and wake the waiter.
    ///
    /// Returns `false` if the slot is out of range or the variable was
    /// destroyed.
    pub fn notify(&self, slot: usize) -> bool {
        let mut state = self.state.lock();
        if state.destroyed {
            return false;
        }
        let Some(fired) = state.fired.get_mut(slot) else {
            return false;
        };
        *fired = true;
        drop(state);

        trace!(slot, "Event variable notified");
        self.ready.notify_one();
        true
    }

    /// Block until at least one slot fired, then move the fired slots into
    /// `out` and clear them.
    ///
    /// Returns `false` once the variable is destroyed.
    pub fn wait(&self, out: &mut Vec<usize>) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.destroyed {
                return false;
            }
            if state.take_fired(out) > 0 {
                return true;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Like [`EventVariable::wait`] but gives up after `timeout`.
    ///
    /// Returns `false` once the variable is destroyed; a timeout returns
    /// `true` with nothing added to `out`.
    pub fn wait_timeout(&self, out: &mut Vec<usize>, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        if state.destroyed {
            return false;
        }
        if state.take_fired(out) == 0 {
            let _ = self.ready.wait_for(&mut state, timeout);
            if state.destroyed {
                return false;
            }
            state.take_fired(out);
        }
        true
    }

    /// Move the currently fired slots into `out` without blocking.
    ///
    /// Returns how many slots were taken.
    pub fn try_take(&self, out: &mut Vec<usize>) -> usize {
        self.state.lock().take_fired(out)
    }

    /// Drop a pending notification of `slot`.
    pub fn reset(&self, slot: usize) {
        if let Some(fired) = self.state.lock().fired.get_mut(slot) {
            *fired = false;
        }
    }

    /// Wake the waiter for good; later waits return immediately.
    pub fn destroy(&self) {
        self.state.lock().destroyed = true;
        self.ready.notify_all();
    }

    /// Whether [`EventVariable::destroy`] was called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_notify_and_try_take() {
        let variable = EventVariable::new(8);
        assert!(variable.notify(3));
        assert!(variable.notify(1));

        let mut fired = Vec::new();
        assert_eq!(variable.try_take(&mut fired), 2);
        assert_eq!(fired, vec![1, 3]);

        fired.clear();
        assert_eq!(variable.try_take(&mut fired), 0);
    }

    #[test]
    fn test_repeated_notify_coalesces() {
        let variable = EventVariable::new(4);
        variable.notify(2);
        variable.notify(2);

        let mut fired = Vec::new();
        variable.try_take(&mut fired);
        assert_eq!(fired, vec![2]);
    }

    #[test]
    fn test_out_of_range_notify_is_ignored() {
        let variable = EventVariable::new(2);
        assert!(!variable.notify(2));

        let mut fired = Vec::new();
        assert_eq!(variable.try_take(&mut fired), 0);
    }

    #[test]
    fn test_reset_drops_pending_notification() {
        let variable = EventVariable::new(4);
        variable.notify(0);
        variable.notify(1);
        variable.reset(0);

        let mut fired = Vec::new();
        variable.try_take(&mut fired);
        assert_eq!(fired, vec![1]);
    }

    #[test]
    fn test_wait_wakes_on_notify_from_other_thread() {
        let variable = Arc::new(EventVariable::new(4));
        let notifier = Arc::clone(&variable);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            notifier.notify(2);
        });

        let mut fired = Vec::new();
        assert!(variable.wait(&mut fired));
        assert_eq!(fired, vec![2]);
        handle.join().unwrap();
    }

    #[test]
    fn test_destroy_releases_waiter() {
        let variable = Arc::new(EventVariable::new(4));
        let destroyer = Arc::clone(&variable);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            destroyer.destroy();
        });

        let mut fired = Vec::new();
        assert!(!variable.wait(&mut fired));
        assert!(variable.is_destroyed());
        assert!(!variable.notify(0));
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_timeout_expires_without_notification() {
        let variable = EventVariable::new(4);
        let mut fired = Vec::new();
        assert!(variable.wait_timeout(&mut fired, Duration::from_millis(10)));
        assert!(fired.is_empty());
    }

    #[test]
    fn test_wait_timeout_returns_pending_immediately() {
        let variable = EventVariable::new(4);
        variable.notify(1);

        let mut fired = Vec::new();
        assert!(variable.wait_timeout(&mut fired, Duration::from_secs(5)));
        assert_eq!(fired, vec![1]);
    }
}
