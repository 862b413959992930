//! Message types for the coordinator task

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::bus::{Callback, SubscriptionId};
use crate::source::SourceNotification;
use crate::timer::TimerKind;
use crate::value::QueryValue;

/// Requests processed by the coordinator task.
///
/// Everything that can change state arrives here: raw source notifications,
/// client calls, and timer firings. Processing order is arrival order, which
/// is what makes transitions deterministic.
pub(crate) enum CoordMsg<T: QueryValue> {
    /// Raw notification from the source
    Source(SourceNotification<T>),

    /// Client-requested re-fetch
    Refresh,

    /// Register a listener callback
    Subscribe {
        id: SubscriptionId,
        callback: Callback<T>,
    },

    /// Remove a listener callback
    Unsubscribe { id: SubscriptionId },

    /// A scheduled timer elapsed
    TimerFired { kind: TimerKind, generation: u64 },

    /// Fetch current diagnostics
    GetMetrics {
        reply_tx: oneshot::Sender<CoordinatorMetrics>,
    },

    /// Tear the coordinator down
    Destroy,
}

impl<T: QueryValue> fmt::Debug for CoordMsg<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordMsg::Source(n) => f
                .debug_struct("Source")
                .field("has_value", &n.value.is_some())
                .field("is_loading", &n.is_loading)
                .field("has_error", &n.error.is_some())
                .finish(),
            CoordMsg::Refresh => write!(f, "Refresh"),
            CoordMsg::Subscribe { id, .. } => f.debug_struct("Subscribe").field("id", id).finish(),
            CoordMsg::Unsubscribe { id } => {
                f.debug_struct("Unsubscribe").field("id", id).finish()
            }
            CoordMsg::TimerFired { kind, generation } => f
                .debug_struct("TimerFired")
                .field("kind", kind)
                .field("generation", generation)
                .finish(),
            CoordMsg::GetMetrics { .. } => write!(f, "GetMetrics"),
            CoordMsg::Destroy => write!(f, "Destroy"),
        }
    }
}

/// Coordinator diagnostics for observability and tests
#[derive(Debug, Clone, Default)]
pub struct CoordinatorMetrics {
    /// Applied state transitions (monotonic)
    pub transitions: u64,
    /// Raw notifications received from the source
    pub source_events: u64,
    /// Data notifications dropped by the duplicate-suppression policy
    pub deduped_events: u64,
    /// Client refresh requests processed
    pub refreshes: u64,
    /// Dwell windows opened
    pub dwell_timers_started: u64,
    /// Timer firings rejected as stale
    pub timer_fires_ignored: u64,
    /// Listener panics contained by the bus
    pub subscriber_panics: u64,
    /// Currently registered listeners
    pub listeners: usize,
    /// Wall-clock time of the last applied transition
    pub last_updated: Option<DateTime<Utc>>,
}
