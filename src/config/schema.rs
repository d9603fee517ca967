use serde::{Deserialize, Serialize};

use crate::bars::Bar;
use crate::conditions::{CachePolicy, ConditionSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub condition_sets: Vec<ConditionSet>,
    #[serde(default)]
    pub bars: Vec<Bar>,
    #[serde(default)]
    pub settings: Settings,
}

pub const DEFAULT_CACHE_WINDOW_MS: u64 = 100;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cache: CacheSettings,
    /// tracing filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// how long a condition or set result is reused, in milliseconds of run time
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_window_ms() -> u64 {
    DEFAULT_CACHE_WINDOW_MS
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: DEFAULT_CACHE_WINDOW_MS,
        }
    }
}

impl CacheSettings {
    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            enabled: self.enabled,
            window: self.window_ms as f64 / 1000.0,
        }
    }
}
