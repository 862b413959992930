//! Livequery - Lifecycle coordination for live-updating queries
//!
//! Livequery turns the raw, bursty notification stream of a sync-engine
//! backed query into a stable visual lifecycle UI code can render directly.
//! Results that arrive almost instantly would otherwise flash a skeleton for
//! a few frames; slow refreshes would otherwise blank out data that is still
//! perfectly displayable. The coordinator removes both artifacts with
//! minimum-display dwell windows and a stale-data retention policy.
//!
//! # Core Concepts
//!
//! - **Five lifecycle states**: initializing, loading, hydrating, ready,
//!   error - exactly one active at any time
//! - **Dwell windows**: once a loading or hydrating presentation starts, it
//!   is held for a configured minimum; the newest result at window close wins
//! - **Stale retention**: an error after a success keeps the last good data
//!   on screen, with the error available for non-blocking display
//! - **Single logical thread**: every notification, client call, and timer
//!   firing is applied in arrival order by one coordinator task
//!
//! # Modules
//!
//! - [`coordinator`] - the coordinator task, its handle, and configuration
//! - [`source`] - the injected live-query capability interface
//! - [`state`] - lifecycle states
//! - [`visual`] - derived UI-facing snapshots
//! - [`error`] - error taxonomy
//! - [`value`] - trait bound on carried data

pub mod coordinator;
pub mod error;
pub mod source;
pub mod state;
pub mod value;
pub mod visual;

mod bus;
mod timer;

// Re-export commonly used types
pub use bus::SubscriptionId;
pub use coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorHandle, CoordinatorMetrics, Subscription,
};
pub use error::QueryError;
pub use source::{QuerySource, SourceHandle, SourceNotification};
pub use state::LifecycleState;
pub use value::QueryValue;
pub use visual::VisualState;
