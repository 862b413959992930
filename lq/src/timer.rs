//! Timer scheduling for the coordinator task

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::coordinator::messages::CoordMsg;
use crate::value::QueryValue;

/// The two timer slots a coordinator owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Initial-load watchdog
    InitialTimeout,
    /// Minimum display window for loading/hydrating
    Dwell,
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerKind::InitialTimeout => write!(f, "initial-timeout"),
            TimerKind::Dwell => write!(f, "dwell"),
        }
    }
}

struct ActiveTimer {
    generation: u64,
    task: JoinHandle<()>,
}

/// Owns at most one timer per kind.
///
/// Each timer is a spawned sleep task that reports back through the
/// coordinator channel. Generations make firings from cancelled or replaced
/// timers no-ops: a fire is only accepted when its generation matches the
/// live slot.
pub(crate) struct TimerManager<T: QueryValue> {
    tx: mpsc::UnboundedSender<CoordMsg<T>>,
    initial: Option<ActiveTimer>,
    dwell: Option<ActiveTimer>,
    next_generation: u64,
}

impl<T: QueryValue> TimerManager<T> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<CoordMsg<T>>) -> Self {
        Self {
            tx,
            initial: None,
            dwell: None,
            next_generation: 0,
        }
    }

    fn slot(&self, kind: TimerKind) -> &Option<ActiveTimer> {
        match kind {
            TimerKind::InitialTimeout => &self.initial,
            TimerKind::Dwell => &self.dwell,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<ActiveTimer> {
        match kind {
            TimerKind::InitialTimeout => &mut self.initial,
            TimerKind::Dwell => &mut self.dwell,
        }
    }

    /// Start a timer of the given kind unless one is already pending.
    ///
    /// Returns whether a new timer was started. A pending timer is never
    /// restarted; overlapping requests collapse onto the open window.
    pub(crate) fn schedule(&mut self, kind: TimerKind, duration: Duration) -> bool {
        if self.slot(kind).is_some() {
            debug!(timer = %kind, "timer already pending; not restarting");
            return false;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(CoordMsg::TimerFired { kind, generation });
        });

        *self.slot_mut(kind) = Some(ActiveTimer { generation, task });
        debug!(timer = %kind, ?duration, generation, "timer scheduled");
        true
    }

    /// Validate a firing against the live slot, clearing it on acceptance.
    pub(crate) fn accept(&mut self, kind: TimerKind, generation: u64) -> bool {
        let slot = self.slot_mut(kind);
        if matches!(slot, Some(active) if active.generation == generation) {
            *slot = None;
            true
        } else {
            debug!(timer = %kind, generation, "stale timer firing ignored");
            false
        }
    }

    pub(crate) fn is_pending(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    pub(crate) fn cancel(&mut self, kind: TimerKind) {
        if let Some(active) = self.slot_mut(kind).take() {
            active.task.abort();
            debug!(timer = %kind, "timer cancelled");
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        self.cancel(TimerKind::InitialTimeout);
        self.cancel(TimerKind::Dwell);
    }
}
