//! Coordinator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for the lifecycle coordinator.
///
/// Every field has a default, so `CoordinatorConfig::default()` and an empty
/// config document both produce a working setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Minimum time the loading presentation is held, in milliseconds
    #[serde(default = "default_minimum_loading_ms")]
    pub minimum_loading_ms: u64,

    /// Minimum time the hydrating presentation is held, in milliseconds
    #[serde(default = "default_minimum_hydrating_ms")]
    pub minimum_hydrating_ms: u64,

    /// Initial-load watchdog in milliseconds; 0 disables it
    #[serde(default = "default_initial_load_timeout_ms")]
    pub initial_load_timeout_ms: u64,

    /// Keep the last good result on screen when an error arrives
    #[serde(default = "default_preserve_stale_data")]
    pub preserve_stale_data: bool,

    /// Oldest retained data still usable as stale display, in milliseconds
    #[serde(default)]
    pub max_stale_ms: Option<u64>,

    /// Window for dropping duplicate data notifications, in milliseconds;
    /// 0 disables the policy
    #[serde(default)]
    pub dedupe_window_ms: u64,
}

fn default_minimum_loading_ms() -> u64 {
    200
}

fn default_minimum_hydrating_ms() -> u64 {
    300
}

fn default_initial_load_timeout_ms() -> u64 {
    10_000
}

fn default_preserve_stale_data() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            minimum_loading_ms: default_minimum_loading_ms(),
            minimum_hydrating_ms: default_minimum_hydrating_ms(),
            initial_load_timeout_ms: default_initial_load_timeout_ms(),
            preserve_stale_data: default_preserve_stale_data(),
            max_stale_ms: None,
            dedupe_window_ms: 0,
        }
    }
}

impl CoordinatorConfig {
    /// Get the loading dwell as a Duration
    pub fn minimum_loading(&self) -> Duration {
        Duration::from_millis(self.minimum_loading_ms)
    }

    /// Get the hydrating dwell as a Duration
    pub fn minimum_hydrating(&self) -> Duration {
        Duration::from_millis(self.minimum_hydrating_ms)
    }

    /// Get the initial-load watchdog, if enabled
    pub fn initial_load_timeout(&self) -> Option<Duration> {
        (self.initial_load_timeout_ms > 0).then(|| Duration::from_millis(self.initial_load_timeout_ms))
    }

    /// Get the stale-data age limit, if configured
    pub fn max_stale(&self) -> Option<Duration> {
        self.max_stale_ms.map(Duration::from_millis)
    }

    /// Get the duplicate-suppression window, if enabled
    pub fn dedupe_window(&self) -> Option<Duration> {
        (self.dedupe_window_ms > 0).then(|| Duration::from_millis(self.dedupe_window_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.minimum_loading_ms, 200);
        assert_eq!(config.minimum_hydrating_ms, 300);
        assert_eq!(config.initial_load_timeout_ms, 10_000);
        assert!(config.preserve_stale_data);
        assert!(config.max_stale_ms.is_none());
        assert_eq!(config.dedupe_window_ms, 0);
    }

    #[test]
    fn test_duration_accessors() {
        let config = CoordinatorConfig {
            minimum_loading_ms: 150,
            minimum_hydrating_ms: 250,
            initial_load_timeout_ms: 5_000,
            max_stale_ms: Some(60_000),
            dedupe_window_ms: 40,
            ..Default::default()
        };
        assert_eq!(config.minimum_loading(), Duration::from_millis(150));
        assert_eq!(config.minimum_hydrating(), Duration::from_millis(250));
        assert_eq!(config.initial_load_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.max_stale(), Some(Duration::from_secs(60)));
        assert_eq!(config.dedupe_window(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_zero_disables_timeout_and_dedupe() {
        let config = CoordinatorConfig {
            initial_load_timeout_ms: 0,
            dedupe_window_ms: 0,
            ..Default::default()
        };
        assert!(config.initial_load_timeout().is_none());
        assert!(config.dedupe_window().is_none());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: CoordinatorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.minimum_loading_ms, 200);
        assert!(config.preserve_stale_data);
    }

    #[test]
    fn test_partial_document_overrides() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"minimum_loading_ms": 50, "preserve_stale_data": false}"#)
                .unwrap();
        assert_eq!(config.minimum_loading_ms, 50);
        assert!(!config.preserve_stale_data);
        assert_eq!(config.minimum_hydrating_ms, 300);
    }
}
