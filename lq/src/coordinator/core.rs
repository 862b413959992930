//! Coordinator task implementation

use std::time::Instant;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::handle::CoordinatorHandle;
use super::messages::{CoordMsg, CoordinatorMetrics};
use crate::bus::{Callback, SubscriptionBus, SubscriptionId};
use crate::error::QueryError;
use crate::source::{QuerySource, SourceHandle, SourceNotification};
use crate::state::{CoordinatorState, DwellPhase, RawResult};
use crate::timer::{TimerKind, TimerManager};
use crate::value::QueryValue;
use crate::visual::{self, VisualState};

#[derive(Default)]
struct Stats {
    source_events: u64,
    deduped_events: u64,
    refreshes: u64,
    dwell_timers_started: u64,
    timer_fires_ignored: u64,
}

/// The coordinator task.
///
/// Owns the lifecycle state, the timers, the listener bus, and the source.
/// All mutation happens inside [`run`](Coordinator::run), which processes raw
/// notifications, client calls, and timer firings strictly in arrival order.
/// That single task is the one logical thread the transition rules assume.
/// Clients interact through [`CoordinatorHandle`].
pub struct Coordinator<T: QueryValue> {
    config: CoordinatorConfig,
    tx: mpsc::UnboundedSender<CoordMsg<T>>,
    rx: mpsc::UnboundedReceiver<CoordMsg<T>>,
    source: Box<dyn QuerySource<T>>,
    state: CoordinatorState<T>,
    timers: TimerManager<T>,
    bus: SubscriptionBus<T>,
    snapshot_tx: watch::Sender<VisualState<T>>,
    snapshot_rx: watch::Receiver<VisualState<T>>,
    stats: Stats,
    /// Most recent raw value and its arrival time, tracked for the
    /// duplicate-suppression window
    last_raw: Option<(T, Instant)>,
}

impl<T: QueryValue> Coordinator<T> {
    /// Create a coordinator bound to a source
    pub fn new(source: Box<dyn QuerySource<T>>, config: CoordinatorConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = CoordinatorState::new();
        let (snapshot_tx, snapshot_rx) = watch::channel(visual::derive(&state));
        let timers = TimerManager::new(tx.clone());

        Self {
            config,
            tx,
            rx,
            source,
            state,
            timers,
            bus: SubscriptionBus::new(),
            snapshot_tx,
            snapshot_rx,
            stats: Stats::default(),
            last_raw: None,
        }
    }

    /// Create a client handle
    pub fn handle(&self) -> CoordinatorHandle<T> {
        CoordinatorHandle::new(self.tx.clone(), self.snapshot_rx.clone())
    }

    /// Create a coordinator and run it as a background task, returning a
    /// handle to it
    pub fn spawn(source: Box<dyn QuerySource<T>>, config: CoordinatorConfig) -> CoordinatorHandle<T>
    where
        T: Sync,
    {
        let coordinator = Self::new(source, config);
        let handle = coordinator.handle();
        tokio::spawn(coordinator.run());
        handle
    }

    /// Run the coordinator task.
    ///
    /// Consumes the coordinator and runs until destroyed.
    pub async fn run(mut self)
    where
        T: Sync,
    {
        self.source.connect(SourceHandle::new(self.tx.clone()));
        if let Some(timeout) = self.config.initial_load_timeout() {
            self.timers.schedule(TimerKind::InitialTimeout, timeout);
        }
        info!("live query coordinator started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                CoordMsg::Source(notification) => self.on_source(notification),

                CoordMsg::Refresh => self.on_refresh(),

                CoordMsg::Subscribe { id, callback } => self.on_subscribe(id, callback),

                CoordMsg::Unsubscribe { id } => self.bus.remove(id),

                CoordMsg::TimerFired { kind, generation } => self.on_timer_fired(kind, generation),

                CoordMsg::GetMetrics { reply_tx } => {
                    let _ = reply_tx.send(self.metrics());
                }

                CoordMsg::Destroy => {
                    self.timers.cancel_all();
                    self.source.destroy();
                    self.bus.clear();
                    info!("live query coordinator destroyed");
                    break;
                }
            }
        }

        debug!("live query coordinator stopped");
    }

    fn on_source(&mut self, notification: SourceNotification<T>) {
        self.stats.source_events += 1;

        // Precedence within one notification: error, then loading, then value.
        if let Some(message) = notification.error {
            debug!(%message, "source reported an error");
            self.timers.cancel(TimerKind::InitialTimeout);
            self.on_terminal(RawResult::Failed(QueryError::source(message)));
        } else if notification.is_loading {
            debug!("source fetch in flight");
            self.enter_in_flight();
        } else if let Some(value) = notification.value {
            if self.is_duplicate(&value) {
                self.stats.deduped_events += 1;
                debug!("duplicate notification suppressed");
                return;
            }
            self.timers.cancel(TimerKind::InitialTimeout);
            self.on_terminal(RawResult::Value(value));
        } else {
            debug!("ignoring empty source notification");
        }
    }

    fn on_refresh(&mut self) {
        self.stats.refreshes += 1;
        self.source.refresh();
        self.enter_in_flight();
    }

    fn on_subscribe(&mut self, id: SubscriptionId, callback: Callback<T>) {
        self.bus.add(id, callback);
        // New listeners see the current snapshot once, then live transitions.
        let snapshot = visual::derive(&self.state);
        self.bus.notify_one(id, &snapshot);
    }

    fn on_timer_fired(&mut self, kind: TimerKind, generation: u64) {
        if !self.timers.accept(kind, generation) {
            self.stats.timer_fires_ignored += 1;
            return;
        }
        match kind {
            TimerKind::InitialTimeout => self.on_initial_timeout(),
            TimerKind::Dwell => self.on_dwell_elapsed(),
        }
    }

    fn on_initial_timeout(&mut self) {
        let after = self.config.initial_load_timeout().unwrap_or_default();
        warn!(?after, "initial load timed out");
        self.on_terminal(RawResult::Failed(QueryError::Timeout { after }));
    }

    fn on_dwell_elapsed(&mut self) {
        let phase = std::mem::replace(&mut self.state.dwell, DwellPhase::Idle);
        match phase {
            DwellPhase::Pending { result: Some(result) } => self.resolve(result),
            DwellPhase::Pending { result: None } => {
                debug!("dwell window closed with no result; awaiting source");
                self.state.dwell = DwellPhase::Lapsed;
            }
            phase => {
                // Timer slot and dwell phase move in lockstep.
                warn!("dwell timer fired outside an open window");
                self.state.dwell = phase;
            }
        }
    }

    /// Route a terminal outcome: hold it while a dwell window is open,
    /// otherwise settle immediately. The held slot is overwritten by newer
    /// outcomes, so the window always closes on the latest one.
    fn on_terminal(&mut self, result: RawResult<T>) {
        if let DwellPhase::Pending { result: pending } = &mut self.state.dwell {
            debug!("dwell window open; holding result until it closes");
            *pending = Some(result);
        } else {
            self.resolve(result);
        }
    }

    /// Apply a terminal outcome and publish the transition
    fn resolve(&mut self, result: RawResult<T>) {
        let from = self.state.state;
        match result {
            RawResult::Value(value) => {
                self.state.apply_success(value, Instant::now(), Utc::now());
            }
            RawResult::Failed(error) => {
                self.state.apply_error(
                    error,
                    self.config.preserve_stale_data,
                    self.config.max_stale(),
                    Instant::now(),
                    Utc::now(),
                );
            }
        }
        self.state.dwell = DwellPhase::Idle;
        debug!(
            from = %from,
            to = %self.state.state,
            transitions = self.state.update_count,
            "lifecycle transition"
        );
        self.publish();
    }

    /// Open a fetch cycle: pick the presentation from the stale-data policy
    /// and start the matching dwell window. Collapses onto an already-open
    /// window instead of restarting it.
    fn enter_in_flight(&mut self) {
        if !self.state.dwell.is_idle() {
            debug!("dwell window already active; collapsing");
            return;
        }

        let stale = self
            .state
            .has_stale_data(self.config.max_stale(), Instant::now());
        let from = self.state.state;
        self.state.enter_in_flight(stale, Utc::now());
        self.state.dwell = DwellPhase::Pending { result: None };

        let duration = if stale {
            self.config.minimum_hydrating()
        } else {
            self.config.minimum_loading()
        };
        if self.timers.schedule(TimerKind::Dwell, duration) {
            self.stats.dwell_timers_started += 1;
        }

        debug!(from = %from, to = %self.state.state, "fetch cycle opened");
        self.publish();
    }

    fn is_duplicate(&mut self, value: &T) -> bool {
        let Some(window) = self.config.dedupe_window() else {
            return false;
        };
        let now = Instant::now();
        let duplicate = matches!(
            &self.last_raw,
            Some((prev, at)) if value.content_eq(prev) && now.duration_since(*at) <= window
        );
        if !duplicate {
            self.last_raw = Some((value.clone(), now));
        }
        duplicate
    }

    fn publish(&mut self) {
        let snapshot = visual::derive(&self.state);
        let _ = self.snapshot_tx.send(snapshot.clone());
        self.bus.notify(&snapshot);
    }

    fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            transitions: self.state.update_count,
            source_events: self.stats.source_events,
            deduped_events: self.stats.deduped_events,
            refreshes: self.stats.refreshes,
            dwell_timers_started: self.stats.dwell_timers_started,
            timer_fires_ignored: self.stats.timer_fires_ignored,
            subscriber_panics: self.bus.panics(),
            listeners: self.bus.len(),
            last_updated: self.state.last_updated,
        }
    }
}
