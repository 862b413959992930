//! Ordered listener registry with per-callback isolation

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::value::QueryValue;
use crate::visual::VisualState;

/// Identifier for one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        SubscriptionId(Uuid::now_v7())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) type Callback<T> = Box<dyn FnMut(&VisualState<T>) + Send>;

/// Ordered collection of listener callbacks.
///
/// Delivery order is insertion order. A panicking listener is contained and
/// logged; the remaining listeners are still notified.
pub(crate) struct SubscriptionBus<T: QueryValue> {
    listeners: Vec<(SubscriptionId, Callback<T>)>,
    panics: u64,
}

impl<T: QueryValue> SubscriptionBus<T> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: Vec::new(),
            panics: 0,
        }
    }

    pub(crate) fn add(&mut self, id: SubscriptionId, callback: Callback<T>) {
        debug!(subscription = %id, "listener registered");
        self.listeners.push((id, callback));
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) {
        let before = self.listeners.len();
        self.listeners.retain(|(entry, _)| *entry != id);
        if self.listeners.len() < before {
            debug!(subscription = %id, "listener removed");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn panics(&self) -> u64 {
        self.panics
    }

    pub(crate) fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Deliver a snapshot to every listener in registration order.
    ///
    /// Iterates over a snapshot of the id list, so listeners added or removed
    /// while delivery is in progress do not disturb the walk.
    pub(crate) fn notify(&mut self, snapshot: &VisualState<T>) {
        let ids: Vec<SubscriptionId> = self.listeners.iter().map(|(id, _)| *id).collect();
        for id in ids {
            self.notify_one(id, snapshot);
        }
    }

    /// Deliver a snapshot to a single listener, containing any panic.
    pub(crate) fn notify_one(&mut self, id: SubscriptionId, snapshot: &VisualState<T>) {
        let Some((_, callback)) = self.listeners.iter_mut().find(|(entry, _)| *entry == id) else {
            return;
        };
        let outcome = catch_unwind(AssertUnwindSafe(|| callback(snapshot)));
        if outcome.is_err() {
            self.panics += 1;
            warn!(subscription = %id, "listener panicked during notification; continuing");
        }
    }
}
