//! Pure derivation of UI-facing state

use crate::error::QueryError;
use crate::state::{CoordinatorState, LifecycleState};
use crate::value::QueryValue;

/// Immutable snapshot handed to the UI layer
///
/// Recomputed on every transition, never mutated in place. A UI renders from
/// the boolean flags alone; the raw `error` rides along only for non-blocking
/// affordances such as a toast.
#[derive(Debug, Clone)]
pub struct VisualState<T: QueryValue> {
    /// Current lifecycle state
    pub state: LifecycleState,
    /// Value to render, if any (may be stale during hydrating or error)
    pub display_data: Option<T>,
    /// Last recorded error, displayed or not
    pub error: Option<QueryError>,
    /// Render the skeleton / full-page spinner
    pub should_show_skeleton: bool,
    /// Render the data view
    pub should_show_data: bool,
    /// Render a subtle refresh indicator over existing data
    pub should_show_subtle_loader: bool,
    /// Render the blocking error view
    pub should_show_error: bool,
    /// Render the empty-result view
    pub should_show_empty: bool,
    /// Whether the view accepts user interaction
    pub can_interact: bool,
    /// No fetch has ever succeeded
    pub is_initial_load: bool,
    /// Displayed data matches the latest known source outcome
    pub is_fresh: bool,
}

/// Map internal state to its visual presentation. Pure: no timers, no side
/// effects.
pub(crate) fn derive<T: QueryValue>(s: &CoordinatorState<T>) -> VisualState<T> {
    let has_data = s.data.is_some();
    let empty = matches!(&s.data, Some(v) if v.is_empty_result());

    let should_show_skeleton = matches!(
        s.state,
        LifecycleState::Initializing | LifecycleState::Loading
    ) && !has_data;
    let should_show_subtle_loader = s.state == LifecycleState::Hydrating;
    let should_show_error = s.state == LifecycleState::Error && !has_data;
    let should_show_empty = s.state == LifecycleState::Ready && (!has_data || empty);
    let can_interact = matches!(s.state, LifecycleState::Ready | LifecycleState::Hydrating);
    let should_show_data = has_data && !should_show_error && !should_show_empty;

    VisualState {
        state: s.state,
        display_data: s.data.clone(),
        error: s.error.clone(),
        should_show_skeleton,
        should_show_data,
        should_show_subtle_loader,
        should_show_error,
        should_show_empty,
        can_interact,
        is_initial_load: s.is_initial_load,
        is_fresh: s.is_fresh,
    }
}
