//! external state read by condition checks
//!
//! the engine never owns the state it evaluates against; the host passes a
//! `GameState` into every evaluation call. `StateSnapshot` is a plain serde
//! implementation used by the CLI (loaded from a JSON file) and by tests.

use std::collections::BTreeSet;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// well-known condition flag ids
pub mod flags {
    pub const NORMAL: u32 = 1;
    pub const DEAD: u32 = 2;
    pub const MOUNTED: u32 = 4;
    pub const CRAFTING: u32 = 5;
    pub const GATHERING: u32 = 6;
    pub const IN_COMBAT: u32 = 26;
    pub const CASTING: u32 = 27;
    pub const IN_CUTSCENE: u32 = 35;
    pub const BOUND_BY_DUTY: u32 = 34;
    pub const WATCHING_CUTSCENE: u32 = 58;
}

/// live state a condition check may read
///
/// implementations must be cheap and non-blocking: checks run on the frame
/// thread, once per render
pub trait GameState {
    /// is the given condition flag currently set
    fn flag(&self, flag: u32) -> bool;
    /// current job id
    fn job(&self) -> u32;
    /// role of the current job
    fn role(&self) -> u32;
    /// current level
    fn level(&self) -> u32;
    /// current zone (territory) id
    fn zone(&self) -> u64;
    /// active HUD layout slot
    fn hud_layout(&self) -> u32;
    /// names of loaded plugins
    fn plugins(&self) -> &[String];
    /// wall-clock time used by the time conditions
    fn local_time(&self) -> NaiveDateTime;
}

/// a serializable point-in-time state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSnapshot {
    pub flags: BTreeSet<u32>,
    pub job: u32,
    pub role: u32,
    pub level: u32,
    pub zone: u64,
    pub hud_layout: u32,
    pub plugins: Vec<String>,
    /// pinned time; `None` reads the system clock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, flag: u32) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_zone(mut self, zone: u64) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_job(mut self, job: u32, role: u32) -> Self {
        self.job = job;
        self.role = role;
        self
    }

    pub fn with_time(mut self, time: NaiveDateTime) -> Self {
        self.time = Some(time);
        self
    }

    pub fn set_flag(&mut self, flag: u32, on: bool) {
        if on {
            self.flags.insert(flag);
        } else {
            self.flags.remove(&flag);
        }
    }
}

impl GameState for StateSnapshot {
    fn flag(&self, flag: u32) -> bool {
        self.flags.contains(&flag)
    }

    fn job(&self) -> u32 {
        self.job
    }

    fn role(&self) -> u32 {
        self.role
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn zone(&self) -> u64 {
        self.zone
    }

    fn hud_layout(&self) -> u32 {
        self.hud_layout
    }

    fn plugins(&self) -> &[String] {
        &self.plugins
    }

    fn local_time(&self) -> NaiveDateTime {
        self.time.unwrap_or_else(|| Local::now().naive_local())
    }
}
