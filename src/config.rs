//! Engine-wide tunables (§6 "Safety caps" and "Throttle interval").
//!
//! A `Default` impl carrying the documented defaults, plus `with_*` methods
//! for programmatic overrides. When the `config-file` feature is enabled,
//! [`EngineConfig::from_file`] loads and merges a TOML/YAML/JSON file,
//! auto-detecting format from the extension — a convenience for host
//! applications that want file-based overrides, never required for correct
//! operation.

use std::time::Duration;

/// Tunables consumed by [`crate::engine::Engine`] and [`crate::schedule::Scheduler`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Minimum interval between two successful executions of the same
    /// automation for the same trigger kind. Default 60s.
    pub throttle_interval: Duration,
    /// Cap on heap entries drained per `Scheduler::tick` call. Default 100.
    pub max_process_per_tick: usize,
    /// Cap on retained `LogEntry` records. Default 100.
    pub max_log_entries: usize,
    /// Cap on retained `EvaluationRecord`s in the `DebugRecorder`. Default 500.
    pub max_evaluations: usize,
    /// Default `max_catch_up_executions` for a `ScheduleSpec` that doesn't
    /// set one explicitly. Default 20.
    pub default_max_catch_up_executions: u32,
    /// How stale a popped heap entry may be (under `CatchUpPolicy::None`) and
    /// still fire once. Default 5 minutes. Exposed per the §9 open question.
    pub catch_up_freshness_window: Duration,
    /// Battery-low hysteresis band above the configured threshold required
    /// before the "fired" flag clears. Default 5 (percentage points).
    pub battery_hysteresis_band: u8,
    /// Poll interval for the silent-node monitor. Default 5 minutes.
    pub silent_node_poll_interval: Duration,
    /// How long a node may go unheard before its presence snapshot reclassifies
    /// from active to inactive (driving `NodeOffline`). Not named in the
    /// distilled spec's fixed defaults table; a separate knob from `NodeSilent`'s
    /// per-automation `minutes`, since presence transitions are generic
    /// (§4.5 "Others: no additional filter") rather than per-trigger-config.
    /// Default 15 minutes.
    pub presence_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throttle_interval: Duration::from_secs(60),
            max_process_per_tick: 100,
            max_log_entries: 100,
            max_evaluations: 500,
            default_max_catch_up_executions: 20,
            catch_up_freshness_window: Duration::from_secs(5 * 60),
            battery_hysteresis_band: 5,
            silent_node_poll_interval: Duration::from_secs(5 * 60),
            presence_timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl EngineConfig {
    /// Start from the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    pub fn with_max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = max;
        self
    }

    pub fn with_max_evaluations(mut self, max: usize) -> Self {
        self.max_evaluations = max;
        self
    }

    pub fn with_catch_up_freshness_window(mut self, window: Duration) -> Self {
        self.catch_up_freshness_window = window;
        self
    }

    pub fn with_presence_timeout(mut self, timeout: Duration) -> Self {
        self.presence_timeout = timeout;
        self
    }
}

#[cfg(feature = "config-file")]
mod file_loader {
    use super::EngineConfig;
    use std::path::Path;

    /// Errors loading an [`EngineConfig`] override file.
    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    pub enum ConfigFileError {
        #[error("config error: {0}")]
        Config(#[from] config::ConfigError),
    }

    #[derive(Debug, serde::Deserialize, Default)]
    #[serde(default)]
    struct RawOverrides {
        throttle_interval_secs: Option<u64>,
        max_process_per_tick: Option<usize>,
        max_log_entries: Option<usize>,
        max_evaluations: Option<usize>,
        default_max_catch_up_executions: Option<u32>,
        catch_up_freshness_window_secs: Option<u64>,
        battery_hysteresis_band: Option<u8>,
        silent_node_poll_interval_secs: Option<u64>,
        presence_timeout_secs: Option<u64>,
    }

    impl EngineConfig {
        /// Load overrides from a TOML/YAML/JSON file (format auto-detected
        /// from the extension by the `config` crate) and merge them on top
        /// of [`EngineConfig::default`]. Any field absent from the file keeps
        /// its default value.
        pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
            let settings = config::Config::builder()
                .add_source(config::File::from(path.as_ref()))
                .build()?;
            let raw: RawOverrides = settings.try_deserialize().unwrap_or_default();
            let mut cfg = EngineConfig::default();
            if let Some(v) = raw.throttle_interval_secs {
                cfg.throttle_interval = std::time::Duration::from_secs(v);
            }
            if let Some(v) = raw.max_process_per_tick {
                cfg.max_process_per_tick = v;
            }
            if let Some(v) = raw.max_log_entries {
                cfg.max_log_entries = v;
            }
            if let Some(v) = raw.max_evaluations {
                cfg.max_evaluations = v;
            }
            if let Some(v) = raw.default_max_catch_up_executions {
                cfg.default_max_catch_up_executions = v;
            }
            if let Some(v) = raw.catch_up_freshness_window_secs {
                cfg.catch_up_freshness_window = std::time::Duration::from_secs(v);
            }
            if let Some(v) = raw.battery_hysteresis_band {
                cfg.battery_hysteresis_band = v;
            }
            if let Some(v) = raw.silent_node_poll_interval_secs {
                cfg.silent_node_poll_interval = std::time::Duration::from_secs(v);
            }
            if let Some(v) = raw.presence_timeout_secs {
                cfg.presence_timeout = std::time::Duration::from_secs(v);
            }
            Ok(cfg)
        }
    }
}

#[cfg(feature = "config-file")]
pub use file_loader::ConfigFileError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.throttle_interval, Duration::from_secs(60));
        assert_eq!(cfg.max_process_per_tick, 100);
        assert_eq!(cfg.max_log_entries, 100);
        assert_eq!(cfg.max_evaluations, 500);
        assert_eq!(cfg.default_max_catch_up_executions, 20);
        assert_eq!(cfg.battery_hysteresis_band, 5);
    }

    #[test]
    fn builder_overrides_individual_fields() {
        let cfg = EngineConfig::new()
            .with_throttle_interval(Duration::from_secs(10))
            .with_max_log_entries(5);
        assert_eq!(cfg.throttle_interval, Duration::from_secs(10));
        assert_eq!(cfg.max_log_entries, 5);
        assert_eq!(cfg.max_evaluations, 500, "untouched field keeps its default");
    }
}
