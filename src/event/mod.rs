//! Change notification shared by every mutable holder in the model.
//!
//! Publishers own an [`EventBus`] and never keep their subscribers alive: the bus only
//! stores weak references, while the [`Subscription`] handed back to the subscriber owns
//! the listener. Dropping the subscription unregisters it; dead entries are pruned the
//! next time the bus emits.
//!
//! Events are delivered strictly in emission order. An event emitted while the bus is
//! already dispatching (for example from inside a listener) is queued and delivered only
//! after the current event has reached every listener.

use log::{trace, warn};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// The two classes of change a holder can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Something was added or removed; consumers must rebuild their view.
    Structural,
    /// An existing value changed; consumers may refresh in place.
    Value,
}

/// Implemented by every event enum so subscribers can filter by class.
pub trait ChangeEvent: Clone + fmt::Debug + 'static {
    fn kind(&self) -> ChangeKind;

    fn is_structural(&self) -> bool {
        self.kind() == ChangeKind::Structural
    }
}

type Callback<E> = RefCell<Box<dyn FnMut(&E)>>;

struct Listener<E> {
    filter: Option<ChangeKind>,
    callback: Callback<E>,
}

/// Publisher side of the notification layer.
pub struct EventBus<E: ChangeEvent> {
    listeners: RefCell<Vec<Weak<Listener<E>>>>,
    pending: RefCell<VecDeque<E>>,
    dispatching: Cell<bool>,
}

impl<E: ChangeEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            dispatching: Cell::new(false),
        }
    }

    /// Registers a listener for every event.
    pub fn subscribe(&self, callback: impl FnMut(&E) + 'static) -> Subscription {
        self.register(None, Box::new(callback))
    }

    /// Registers a listener that only receives events of the given class.
    pub fn subscribe_kind(
        &self,
        kind: ChangeKind,
        callback: impl FnMut(&E) + 'static,
    ) -> Subscription {
        self.register(Some(kind), Box::new(callback))
    }

    fn register(&self, filter: Option<ChangeKind>, callback: Box<dyn FnMut(&E)>) -> Subscription {
        let listener = Rc::new(Listener {
            filter,
            callback: RefCell::new(callback),
        });
        self.listeners.borrow_mut().push(Rc::downgrade(&listener));
        Subscription {
            _listener: listener,
        }
    }

    /// Number of listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    /// Queues an event and, unless a dispatch is already running, delivers the queue.
    pub fn emit(&self, event: E) {
        self.pending.borrow_mut().push_back(event);
        if self.dispatching.get() {
            return;
        }

        let _guard = DispatchGuard::enter(&self.dispatching);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(event) = next else { break };
            self.dispatch(&event);
        }
    }

    fn dispatch(&self, event: &E) {
        // Prune dead handles and take strong references before calling out, so listeners
        // may subscribe or drop subscriptions while being notified.
        let live: Vec<Rc<Listener<E>>> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        trace!("Dispatching {:?} to {} listener(s)", event, live.len());

        let kind = event.kind();
        for listener in live {
            if listener.filter.is_some_and(|f| f != kind) {
                continue;
            }
            match listener.callback.try_borrow_mut() {
                Ok(mut callback) => callback(event),
                Err(_) => warn!("Skipped re-entrant delivery of {:?}", event),
            }
        }
    }
}

/// Clears the dispatching flag on exit, including when a listener panics.
struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl<E: ChangeEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning a holder never clones who listens to it.
impl<E: ChangeEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E: ChangeEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Subscriber side handle. The listener stays registered exactly as long as this lives.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    _listener: Rc<dyn Any>,
}

impl Subscription {
    /// Explicitly releases the listener. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription")
    }
}
