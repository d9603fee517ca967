//! condition evaluation and caching engine
//!
//! - a registry of named predicates over external state, grouped in categories
//! - condition sets: ordered refs folded left to right with and/or/xor/equals
//! - per-condition and per-set result caches bounded by a run-time window
//! - a re-entrancy guard for sets that reference themselves through other sets
//!
//! hosts call `ConditionEngine::check_condition_set_index` once per frame for
//! every visibility rule and advance the engine's run time between frames.

mod builtin;
mod cache;
mod engine;
mod registry;
mod time;
mod types;

pub use builtin::{builtin_conditions, builtin_registry, condition_set_condition, CONDITION_SET_ID};
pub use cache::{CachePolicy, CacheStats, CheckCache, SetCache, DEFAULT_CACHE_WINDOW};
pub use engine::{CheckContext, ConditionEngine, EngineStats, ValidationIssue};
pub use registry::{
    CheckFn, Condition, ConditionCategory, ConditionRegistry, ExistsFn, RegistryBuilder,
    RegistryError,
};
pub use types::{ConditionArg, ConditionRef, ConditionSet, Operator};

// time spec parsing is exposed for config validation
pub use time::{parse_days, parse_time_ranges};
