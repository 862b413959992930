//! Capability interface for the external live query

use tokio::sync::mpsc;
use tracing::debug;

use crate::coordinator::messages::CoordMsg;
use crate::value::QueryValue;

/// One raw notification pushed by the source
#[derive(Debug, Clone)]
pub struct SourceNotification<T> {
    /// Latest result set, when the source has one
    pub value: Option<T>,
    /// Whether a fetch is currently in flight on the source side
    pub is_loading: bool,
    /// Failure reported by the source, stringified at the boundary
    pub error: Option<String>,
}

impl<T> SourceNotification<T> {
    /// A settled successful result
    pub fn value(value: T) -> Self {
        Self {
            value: Some(value),
            is_loading: false,
            error: None,
        }
    }

    /// A fetch-in-flight signal with no result yet
    pub fn loading() -> Self {
        Self {
            value: None,
            is_loading: true,
            error: None,
        }
    }

    /// A settled failure
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            value: None,
            is_loading: false,
            error: Some(message.into()),
        }
    }
}

/// The injected live-query capability.
///
/// The coordinator owns exactly one boxed source. `connect` is called once at
/// startup with a [`SourceHandle`] the source keeps for pushing
/// notifications; `refresh` is fire-and-forget (effects arrive as
/// notifications); `destroy` releases whatever the source holds.
///
/// Implementations are swapped freely: a real sync-engine binding in the app,
/// a scripted double in tests.
pub trait QuerySource<T: QueryValue>: Send + 'static {
    /// Begin pushing notifications through the given handle
    fn connect(&mut self, handle: SourceHandle<T>);

    /// Trigger a re-fetch; completion is observed via notifications
    fn refresh(&mut self);

    /// Release the source's resources
    fn destroy(&mut self);
}

/// Sender half handed to the source on `connect`.
///
/// Cloneable and callable from any thread; notifications are marshalled onto
/// the coordinator task, which is the only place state changes. After the
/// coordinator is destroyed, notifications are silently dropped.
pub struct SourceHandle<T: QueryValue> {
    tx: mpsc::UnboundedSender<CoordMsg<T>>,
}

impl<T: QueryValue> Clone for SourceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: QueryValue> SourceHandle<T> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<CoordMsg<T>>) -> Self {
        Self { tx }
    }

    /// Push one raw notification to the coordinator
    pub fn notify(&self, notification: SourceNotification<T>) {
        if self.tx.send(CoordMsg::Source(notification)).is_err() {
            debug!("source notification dropped; coordinator stopped");
        }
    }
}
