//! Device event dispatch.
//!
//! Resources register here to learn about device destruction and recreation.
//! The dispatcher must tolerate reentrancy: a listener callback may drop
//! other resources, which re-enters `remove_listener`, or construct new
//! ones, which re-enters `add_listener`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use parking_lot::Mutex;

/// Lifecycle events delivered to registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The logical device is about to be destroyed. Release device-side
    /// handles now; descriptive state stays.
    Destroy,
    /// A new logical device is live. Rebuild device-side handles.
    Create,
}

/// A listener for device lifecycle events.
pub trait DeviceEventListener: Send + Sync {
    /// Called before the logical device is destroyed.
    fn on_device_destroy(&self);

    /// Called after a new logical device is created.
    fn on_device_create(&self);
}

/// Stable identity of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    // Tombstoned (removed during dispatch) entries hold None; the slot is
    // compacted once dispatch finishes so snapshot indices stay stable.
    listener: Option<Weak<dyn DeviceEventListener>>,
}

#[derive(Default)]
struct DispatcherState {
    dispatching: bool,
    listeners: Vec<Entry>,
    // Listeners added during dispatch; merged afterwards so they never see
    // the dispatch that was running when they registered.
    pending: Vec<Entry>,
}

/// Registry and dispatch loop for device lifecycle events.
#[derive(Default)]
pub struct EventDispatcher {
    state: Mutex<DispatcherState>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its stable identity.
    ///
    /// The dispatcher holds a weak reference; a dropped listener is skipped
    /// and eventually pruned.
    pub fn add_listener(&self, listener: Weak<dyn DeviceEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Entry {
            id,
            listener: Some(listener),
        };
        let mut state = self.state.lock();
        if state.dispatching {
            state.pending.push(entry);
        } else {
            state.listeners.push(entry);
        }
        id
    }

    /// Unregister a listener.
    ///
    /// During dispatch the entry is tombstoned in place, never shifted, so a
    /// running dispatch skips it without invalidating its index snapshot.
    pub fn remove_listener(&self, id: ListenerId) {
        let mut state = self.state.lock();
        if state.dispatching {
            if let Some(entry) = state.listeners.iter_mut().find(|e| e.id == id) {
                entry.listener = None;
            }
            state.pending.retain(|e| e.id != id);
        } else {
            state.listeners.retain(|e| e.id != id);
        }
    }

    /// Number of registered listeners, tombstones excluded.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.listeners.iter().filter(|e| e.listener.is_some()).count() + state.pending.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every listener registered before this call.
    ///
    /// The lock is released around each callback. Listeners removed by an
    /// earlier callback of the same dispatch are skipped; listeners added
    /// during dispatch are deferred to the next one.
    pub fn dispatch(&self, event: DeviceEvent) {
        let count = {
            let mut state = self.state.lock();
            debug_assert!(!state.dispatching, "dispatch is not reentrant");
            state.dispatching = true;
            state.listeners.len()
        };

        log::trace!("dispatching {:?} to {} listeners", event, count);

        for index in 0..count {
            // Indices stay valid: removals during dispatch tombstone in
            // place and additions go to the pending list.
            let listener = {
                let state = self.state.lock();
                state.listeners[index]
                    .listener
                    .as_ref()
                    .and_then(Weak::upgrade)
            };
            if let Some(listener) = listener {
                match event {
                    DeviceEvent::Destroy => listener.on_device_destroy(),
                    DeviceEvent::Create => listener.on_device_create(),
                }
            }
        }

        let mut state = self.state.lock();
        state.dispatching = false;
        state
            .listeners
            .retain(|e| e.listener.as_ref().is_some_and(|w| w.strong_count() > 0));
        let pending = std::mem::take(&mut state.pending);
        state.listeners.extend(pending);
    }
}

static_assertions::assert_impl_all!(EventDispatcher: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        destroys: AtomicUsize,
        creates: AtomicUsize,
    }

    impl DeviceEventListener for Recorder {
        fn on_device_destroy(&self) {
            self.destroys.fetch_add(1, Ordering::SeqCst);
        }
        fn on_device_create(&self) {
            self.creates.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_dispatch_reaches_listeners() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        let id = dispatcher
            .add_listener(Arc::downgrade(&recorder) as Weak<dyn DeviceEventListener>);

        dispatcher.dispatch(DeviceEvent::Destroy);
        dispatcher.dispatch(DeviceEvent::Create);
        assert_eq!(recorder.destroys.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.creates.load(Ordering::SeqCst), 1);

        dispatcher.remove_listener(id);
        dispatcher.dispatch(DeviceEvent::Create);
        assert_eq!(recorder.creates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_listener_is_skipped_and_pruned() {
        let dispatcher = EventDispatcher::new();
        let recorder = Arc::new(Recorder::default());
        dispatcher.add_listener(Arc::downgrade(&recorder) as Weak<dyn DeviceEventListener>);
        drop(recorder);

        dispatcher.dispatch(DeviceEvent::Create);
        assert!(dispatcher.is_empty());
    }

    struct SelfRemover {
        dispatcher: Arc<EventDispatcher>,
        id: PlMutex<Option<ListenerId>>,
        fired: AtomicUsize,
    }

    impl DeviceEventListener for SelfRemover {
        fn on_device_destroy(&self) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = self.id.lock().take() {
                self.dispatcher.remove_listener(id);
            }
        }
        fn on_device_create(&self) {}
    }

    #[test]
    fn test_listener_can_remove_itself_during_dispatch() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let remover = Arc::new(SelfRemover {
            dispatcher: Arc::clone(&dispatcher),
            id: PlMutex::new(None),
            fired: AtomicUsize::new(0),
        });
        let tail = Arc::new(Recorder::default());

        let id = dispatcher
            .add_listener(Arc::downgrade(&remover) as Weak<dyn DeviceEventListener>);
        *remover.id.lock() = Some(id);
        dispatcher.add_listener(Arc::downgrade(&tail) as Weak<dyn DeviceEventListener>);

        dispatcher.dispatch(DeviceEvent::Destroy);
        assert_eq!(remover.fired.load(Ordering::SeqCst), 1);
        // Listeners after the removed one still run.
        assert_eq!(tail.destroys.load(Ordering::SeqCst), 1);

        dispatcher.dispatch(DeviceEvent::Destroy);
        assert_eq!(remover.fired.load(Ordering::SeqCst), 1);
    }

    struct Adder {
        dispatcher: Arc<EventDispatcher>,
        added: PlMutex<Option<Arc<Recorder>>>,
    }

    impl DeviceEventListener for Adder {
        fn on_device_destroy(&self) {}
        fn on_device_create(&self) {
            let recorder = Arc::new(Recorder::default());
            self.dispatcher
                .add_listener(Arc::downgrade(&recorder) as Weak<dyn DeviceEventListener>);
            *self.added.lock() = Some(recorder);
        }
    }

    #[test]
    fn test_additions_during_dispatch_are_deferred() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let adder = Arc::new(Adder {
            dispatcher: Arc::clone(&dispatcher),
            added: PlMutex::new(None),
        });
        dispatcher.add_listener(Arc::downgrade(&adder) as Weak<dyn DeviceEventListener>);

        dispatcher.dispatch(DeviceEvent::Create);
        let recorder = adder.added.lock().clone().unwrap();
        // The new listener missed the dispatch it was added during.
        assert_eq!(recorder.creates.load(Ordering::SeqCst), 0);

        dispatcher.dispatch(DeviceEvent::Create);
        assert_eq!(recorder.creates.load(Ordering::SeqCst), 1);
    }
}
