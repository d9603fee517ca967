//! short-lived memoization for condition and set results
//!
//! both caches are cleared wholesale once the run time has moved more than
//! `window` seconds past the last clear. a disabled policy is a window of zero,
//! which clears on every lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::types::ConditionArg;

pub const DEFAULT_CACHE_WINDOW: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub enabled: bool,
    /// seconds of run time a cached result stays valid
    pub window: f64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            window: DEFAULT_CACHE_WINDOW,
        }
    }
}

impl CachePolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            window: DEFAULT_CACHE_WINDOW,
        }
    }

    pub fn with_window(window: f64) -> Self {
        Self {
            enabled: true,
            window,
        }
    }

    pub fn effective_window(&self) -> f64 {
        if self.enabled {
            self.window.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub clears: u64,
}

/// tracks when a cache was last cleared
#[derive(Debug, Clone, Copy, Default)]
struct Expiry {
    last_clear: f64,
}

impl Expiry {
    fn due(&self, now: f64, window: f64) -> bool {
        window <= 0.0 || now - self.last_clear > window
    }
}

/// (condition id, arg) -> result
#[derive(Debug, Default)]
pub struct CheckCache {
    entries: HashMap<String, HashMap<ConditionArg, bool>>,
    expiry: Expiry,
    stats: CacheStats,
}

impl CheckCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// drop every entry if the window has elapsed
    pub fn refresh(&mut self, now: f64, window: f64) {
        if self.expiry.due(now, window) {
            if !self.entries.is_empty() {
                self.stats.clears += 1;
            }
            self.entries.clear();
            self.expiry.last_clear = now;
        }
    }

    pub fn get(&mut self, id: &str, arg: &ConditionArg) -> Option<bool> {
        let hit = self.entries.get(id).and_then(|by_arg| by_arg.get(arg)).copied();
        match hit {
            Some(_) => self.stats.hits += 1,
            None => self.stats.misses += 1,
        }
        hit
    }

    pub fn insert(&mut self, id: &str, arg: &ConditionArg, value: bool) {
        self.entries
            .entry(id.to_string())
            .or_default()
            .insert(arg.clone(), value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

/// set index -> result
#[derive(Debug, Default)]
pub struct SetCache {
    entries: HashMap<usize, bool>,
    /// last committed result per set; survives timed clears and backs the
    /// fallback returned when a set is re-entered while being evaluated
    committed: HashMap<usize, bool>,
    expiry: Expiry,
    stats: CacheStats,
}

impl SetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, now: f64, window: f64) {
        if self.expiry.due(now, window) {
            if !self.entries.is_empty() {
                self.stats.clears += 1;
            }
            self.entries.clear();
            self.expiry.last_clear = now;
        }
    }

    pub fn get(&mut self, index: usize) -> Option<bool> {
        let hit = self.entries.get(&index).copied();
        match hit {
            Some(_) => self.stats.hits += 1,
            None => self.stats.misses += 1,
        }
        hit
    }

    pub fn commit(&mut self, index: usize, value: bool) {
        self.entries.insert(index, value);
        self.committed.insert(index, value);
    }

    /// value to hand back when a set is re-entered mid-evaluation
    pub fn last_committed(&self, index: usize) -> Option<bool> {
        self.committed.get(&index).copied()
    }

    /// forget everything, including committed values
    pub fn clear(&mut self) {
        self.entries.clear();
        self.committed.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
