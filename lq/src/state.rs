//! Internal lifecycle state and transition policy

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::value::QueryValue;

/// The five visual lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// Created, no source activity observed yet
    Initializing,
    /// Fetch in flight with nothing to display
    Loading,
    /// Fetch in flight while previous data stays on screen
    Hydrating,
    /// A result is displayed
    Ready,
    /// An error is the latest outcome
    Error,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Initializing => "initializing",
            LifecycleState::Loading => "loading",
            LifecycleState::Hydrating => "hydrating",
            LifecycleState::Ready => "ready",
            LifecycleState::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// Terminal outcome of one fetch cycle
#[derive(Debug, Clone)]
pub(crate) enum RawResult<T> {
    Value(T),
    Failed(QueryError),
}

/// Dwell sub-state layered over the lifecycle
///
/// `Pending` means a minimum-display timer is running; `result` holds the
/// newest terminal outcome observed since the window opened (last write
/// wins). `Lapsed` means the window elapsed with no outcome yet, so the next
/// one applies immediately.
#[derive(Debug, Clone)]
pub(crate) enum DwellPhase<T> {
    Idle,
    Pending { result: Option<RawResult<T>> },
    Lapsed,
}

impl<T> DwellPhase<T> {
    pub(crate) fn is_idle(&self) -> bool {
        matches!(self, DwellPhase::Idle)
    }
}

/// Mutable state owned by the coordinator task
#[derive(Debug)]
pub(crate) struct CoordinatorState<T: QueryValue> {
    pub(crate) data: Option<T>,
    pub(crate) error: Option<QueryError>,
    pub(crate) state: LifecycleState,
    pub(crate) is_initial_load: bool,
    pub(crate) is_fresh: bool,
    pub(crate) last_updated: Option<DateTime<Utc>>,
    pub(crate) update_count: u64,
    pub(crate) dwell: DwellPhase<T>,
    pub(crate) data_applied_at: Option<Instant>,
}

impl<T: QueryValue> CoordinatorState<T> {
    pub(crate) fn new() -> Self {
        Self {
            data: None,
            error: None,
            state: LifecycleState::Initializing,
            is_initial_load: true,
            is_fresh: false,
            last_updated: None,
            update_count: 0,
            dwell: DwellPhase::Idle,
            data_applied_at: None,
        }
    }

    fn touch(&mut self, now_utc: DateTime<Utc>) {
        self.update_count += 1;
        self.last_updated = Some(now_utc);
    }

    /// Whether retained data is recent enough to count as stale-but-usable
    fn stale_within(&self, max_stale: Option<Duration>, now: Instant) -> bool {
        let Some(limit) = max_stale else {
            return true;
        };
        match self.data_applied_at {
            Some(applied) => now.duration_since(applied) <= limit,
            None => false,
        }
    }

    /// Whether an in-flight fetch should present over retained data
    ///
    /// Data retained through an error lifecycle does not count: a retry after
    /// an error goes back through the full loading presentation.
    pub(crate) fn has_stale_data(&self, max_stale: Option<Duration>, now: Instant) -> bool {
        self.data.is_some() && self.state != LifecycleState::Error && self.stale_within(max_stale, now)
    }

    /// Apply a successful result as the settled outcome
    pub(crate) fn apply_success(&mut self, value: T, now: Instant, now_utc: DateTime<Utc>) {
        self.data = Some(value);
        self.error = None;
        self.state = LifecycleState::Ready;
        self.is_initial_load = false;
        self.is_fresh = true;
        self.data_applied_at = Some(now);
        self.touch(now_utc);
    }

    /// Apply an error as the settled outcome, subject to the retention policy
    pub(crate) fn apply_error(
        &mut self,
        error: QueryError,
        preserve_stale: bool,
        max_stale: Option<Duration>,
        now: Instant,
        now_utc: DateTime<Utc>,
    ) {
        let retain = preserve_stale && self.data.is_some() && self.stale_within(max_stale, now);
        if !retain {
            self.data = None;
            self.data_applied_at = None;
        }
        self.is_fresh = false;
        self.state = LifecycleState::Error;
        self.error = Some(error);
        self.touch(now_utc);
    }

    /// Enter the in-flight presentation for a new fetch cycle
    pub(crate) fn enter_in_flight(&mut self, stale: bool, now_utc: DateTime<Utc>) {
        self.state = if stale {
            LifecycleState::Hydrating
        } else {
            LifecycleState::Loading
        };
        self.touch(now_utc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fresh() -> CoordinatorState<Vec<String>> {
        CoordinatorState::new()
    }

    fn rows(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_state_is_initializing() {
        let state = fresh();
        assert_eq!(state.state, LifecycleState::Initializing);
        assert!(state.data.is_none());
        assert!(state.error.is_none());
        assert!(state.is_initial_load);
        assert_eq!(state.update_count, 0);
        assert!(state.dwell.is_idle());
    }

    #[test]
    fn test_apply_success_settles_ready() {
        let mut state = fresh();
        state.apply_success(rows(&["a"]), Instant::now(), Utc::now());

        assert_eq!(state.state, LifecycleState::Ready);
        assert_eq!(state.data, Some(rows(&["a"])));
        assert!(!state.is_initial_load);
        assert!(state.is_fresh);
        assert_eq!(state.update_count, 1);
        assert!(state.last_updated.is_some());
    }

    #[test]
    fn test_success_clears_previous_error() {
        let mut state = fresh();
        state.apply_error(
            QueryError::source("boom"),
            true,
            None,
            Instant::now(),
            Utc::now(),
        );
        state.apply_success(rows(&["a"]), Instant::now(), Utc::now());

        assert!(state.error.is_none());
        assert_eq!(state.state, LifecycleState::Ready);
    }

    #[test]
    fn test_error_without_prior_success_clears_data() {
        let mut state = fresh();
        state.apply_error(
            QueryError::source("boom"),
            true,
            None,
            Instant::now(),
            Utc::now(),
        );

        assert_eq!(state.state, LifecycleState::Error);
        assert!(state.data.is_none());
        assert_eq!(state.error, Some(QueryError::source("boom")));
    }

    #[test]
    fn test_error_after_success_retains_data() {
        let mut state = fresh();
        state.apply_success(rows(&["a"]), Instant::now(), Utc::now());
        state.apply_error(
            QueryError::source("boom"),
            true,
            None,
            Instant::now(),
            Utc::now(),
        );

        assert_eq!(state.state, LifecycleState::Error);
        assert_eq!(state.data, Some(rows(&["a"])));
        assert!(!state.is_fresh);
    }

    #[test]
    fn test_error_without_retention_clears_data() {
        let mut state = fresh();
        state.apply_success(rows(&["a"]), Instant::now(), Utc::now());
        state.apply_error(
            QueryError::source("boom"),
            false,
            None,
            Instant::now(),
            Utc::now(),
        );

        assert_eq!(state.state, LifecycleState::Error);
        assert!(state.data.is_none());
    }

    #[test]
    fn test_max_stale_expires_retention() {
        let mut state = fresh();
        let applied = Instant::now();
        state.apply_success(rows(&["a"]), applied, Utc::now());

        let later = applied + Duration::from_secs(60);
        let limit = Some(Duration::from_secs(30));

        assert!(!state.has_stale_data(limit, later));
        state.apply_error(QueryError::source("boom"), true, limit, later, Utc::now());
        assert!(state.data.is_none());
    }

    #[test]
    fn test_stale_data_not_counted_in_error_lifecycle() {
        let mut state = fresh();
        state.apply_success(rows(&["a"]), Instant::now(), Utc::now());
        state.apply_error(
            QueryError::source("boom"),
            true,
            None,
            Instant::now(),
            Utc::now(),
        );

        // Data survives for display, but a retry restarts the full loading path.
        assert!(state.data.is_some());
        assert!(!state.has_stale_data(None, Instant::now()));
    }

    #[test]
    fn test_enter_in_flight_picks_presentation() {
        let mut state = fresh();
        state.enter_in_flight(false, Utc::now());
        assert_eq!(state.state, LifecycleState::Loading);

        state.apply_success(rows(&["a"]), Instant::now(), Utc::now());
        state.enter_in_flight(true, Utc::now());
        assert_eq!(state.state, LifecycleState::Hydrating);
    }

    #[test]
    fn test_lifecycle_state_serde_kebab_case() {
        let json = serde_json::to_string(&LifecycleState::Hydrating).unwrap();
        assert_eq!(json, "\"hydrating\"");
        let parsed: LifecycleState = serde_json::from_str("\"initializing\"").unwrap();
        assert_eq!(parsed, LifecycleState::Initializing);
    }

    proptest! {
        /// Any error application lands in the error lifecycle with the error
        /// recorded, and the retention policy alone decides whether data
        /// survives.
        #[test]
        fn prop_error_policy_invariants(
            had_success in any::<bool>(),
            preserve in any::<bool>(),
            message in "[a-z]{1,16}",
        ) {
            let mut state = fresh();
            if had_success {
                state.apply_success(rows(&["seed"]), Instant::now(), Utc::now());
            }
            let before = state.update_count;

            state.apply_error(
                QueryError::source(message),
                preserve,
                None,
                Instant::now(),
                Utc::now(),
            );

            prop_assert_eq!(state.state, LifecycleState::Error);
            prop_assert!(state.error.is_some());
            prop_assert_eq!(state.update_count, before + 1);
            prop_assert_eq!(state.data.is_some(), had_success && preserve);
            prop_assert!(!state.is_fresh);
        }

        /// A success always settles ready, fresh, and error-free no matter
        /// what came before.
        #[test]
        fn prop_success_always_settles(
            had_error in any::<bool>(),
            preserve in any::<bool>(),
        ) {
            let mut state = fresh();
            if had_error {
                state.apply_error(
                    QueryError::source("seed"),
                    preserve,
                    None,
                    Instant::now(),
                    Utc::now(),
                );
            }

            state.apply_success(rows(&["value"]), Instant::now(), Utc::now());

            prop_assert_eq!(state.state, LifecycleState::Ready);
            prop_assert!(state.error.is_none());
            prop_assert!(state.is_fresh);
            prop_assert!(!state.is_initial_load);
        }
    }
}
