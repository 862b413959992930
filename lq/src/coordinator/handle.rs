//! Client interface to a running coordinator

use eyre::{Result, eyre};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::messages::{CoordMsg, CoordinatorMetrics};
use crate::bus::SubscriptionId;
use crate::error::QueryError;
use crate::state::LifecycleState;
use crate::value::QueryValue;
use crate::visual::VisualState;

/// Handle for UI code to interact with a coordinator.
///
/// Cloneable; every clone talks to the same coordinator task. Getters are
/// synchronous reads of the last published snapshot, so they are safe to call
/// from render paths. `refresh` and `destroy` are non-blocking and become
/// silent no-ops once the coordinator is gone.
pub struct CoordinatorHandle<T: QueryValue> {
    tx: mpsc::UnboundedSender<CoordMsg<T>>,
    snapshot: watch::Receiver<VisualState<T>>,
}

impl<T: QueryValue> Clone for CoordinatorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            snapshot: self.snapshot.clone(),
        }
    }
}

impl<T: QueryValue> CoordinatorHandle<T> {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<CoordMsg<T>>,
        snapshot: watch::Receiver<VisualState<T>>,
    ) -> Self {
        Self { tx, snapshot }
    }

    /// Current visual snapshot
    pub fn visual_state(&self) -> VisualState<T> {
        self.snapshot.borrow().clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.snapshot.borrow().state
    }

    /// Last successfully applied value, if retained
    pub fn data(&self) -> Option<T> {
        self.snapshot.borrow().display_data.clone()
    }

    /// Last recorded error, displayed or not
    pub fn error(&self) -> Option<QueryError> {
        self.snapshot.borrow().error.clone()
    }

    /// Whether the coordinator has settled on a displayed result
    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Watch receiver over published snapshots, for async consumers
    pub fn watch(&self) -> watch::Receiver<VisualState<T>> {
        self.snapshot.clone()
    }

    /// Trigger a re-fetch; completion is observed via snapshots
    pub fn refresh(&self) {
        if self.tx.send(CoordMsg::Refresh).is_err() {
            debug!("refresh ignored; coordinator stopped");
        }
    }

    /// Tear the coordinator down. Safe to call more than once.
    pub fn destroy(&self) {
        if self.tx.send(CoordMsg::Destroy).is_err() {
            debug!("destroy ignored; coordinator already stopped");
        }
    }

    /// Register a listener callback.
    ///
    /// The listener receives the current snapshot once upon registration,
    /// then every subsequent transition, until the returned [`Subscription`]
    /// is dropped or explicitly unsubscribed.
    pub fn subscribe(
        &self,
        callback: impl FnMut(&VisualState<T>) + Send + 'static,
    ) -> Subscription<T> {
        let id = SubscriptionId::new();
        if self
            .tx
            .send(CoordMsg::Subscribe {
                id,
                callback: Box::new(callback),
            })
            .is_err()
        {
            debug!("subscription ignored; coordinator stopped");
        }
        Subscription {
            id,
            tx: self.tx.clone(),
            active: true,
        }
    }

    /// Fetch current coordinator diagnostics
    pub async fn metrics(&self) -> Result<CoordinatorMetrics> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(CoordMsg::GetMetrics { reply_tx })
            .map_err(|_| eyre!("coordinator channel closed"))?;
        reply_rx
            .await
            .map_err(|_| eyre!("coordinator stopped before reply"))
    }
}

/// Registration guard for one listener.
///
/// Unsubscribes on drop; hold it for as long as the listener should stay
/// registered.
pub struct Subscription<T: QueryValue> {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<CoordMsg<T>>,
    active: bool,
}

impl<T: QueryValue> Subscription<T> {
    /// This subscription's identifier
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Explicitly remove the listener
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.active {
            self.active = false;
            let _ = self.tx.send(CoordMsg::Unsubscribe { id: self.id });
        }
    }
}

impl<T: QueryValue> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}
