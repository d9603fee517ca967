//! condition set evaluator
//!
//! a set is a left-to-right fold over its refs: no precedence, no grouping.
//! leaves whose id is not registered are left out of the fold and a set with
//! nothing left evaluates to `true`. results are memoized per leaf and per set
//! for a short window of run time.
//!
//! sets can reference other sets by index through the condition-set condition,
//! so evaluation is re-entrant. a set that is entered again while it is still
//! being evaluated is not recursed into; the caller gets the set's last
//! committed result instead, or `false` if it never finished an evaluation.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use super::builtin::CONDITION_SET_ID;
use super::cache::{CachePolicy, CacheStats, CheckCache, SetCache};
use super::registry::ConditionRegistry;
use super::types::{ConditionArg, ConditionSet};
use crate::state::GameState;

/// what a condition check can see while it runs
pub struct CheckContext<'a> {
    engine: &'a ConditionEngine,
    state: &'a dyn GameState,
}

impl<'a> CheckContext<'a> {
    pub fn state(&self) -> &'a dyn GameState {
        self.state
    }

    pub fn run_time(&self) -> f64 {
        self.engine.run_time()
    }

    /// is there a set at this index in the engine's collection
    pub fn has_condition_set(&self, index: i64) -> bool {
        self.engine.resolve_index(index).is_some()
    }

    /// evaluate another set from inside a check; unknown indices are `false`
    pub fn check_condition_set(&self, index: i64) -> bool {
        match self.engine.resolve_index(index) {
            Some(index) => self.engine.evaluate_indexed(self, index),
            None => false,
        }
    }

    /// check another condition through the leaf cache
    pub fn check_condition(&self, id: &str, arg: &ConditionArg) -> bool {
        self.engine.check_leaf(self, id, arg)
    }
}

/// a problem found in a set at edit or import time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    UnknownCondition {
        position: usize,
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    SetIndexOutOfRange {
        position: usize,
        index: i64,
    },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::UnknownCondition {
                position,
                id,
                suggestion: Some(s),
            } => write!(
                f,
                "condition {}: unknown id '{}' (did you mean '{}'?)",
                position, id, s
            ),
            ValidationIssue::UnknownCondition { position, id, .. } => {
                write!(f, "condition {}: unknown id '{}'", position, id)
            }
            ValidationIssue::SetIndexOutOfRange { position, index } => write!(
                f,
                "condition {}: condition set index {} does not exist",
                position, index
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub checks: CacheStats,
    pub sets: CacheStats,
}

/// pops a set off the in-progress marks when evaluation leaves it, even by unwinding
struct Reentry<'a> {
    marks: &'a RefCell<HashSet<usize>>,
    index: usize,
}

impl<'a> Reentry<'a> {
    /// mark `index` as in progress; `None` if it already was
    fn enter(marks: &'a RefCell<HashSet<usize>>, index: usize) -> Option<Self> {
        if marks.borrow_mut().insert(index) {
            Some(Self { marks, index })
        } else {
            None
        }
    }
}

impl Drop for Reentry<'_> {
    fn drop(&mut self) {
        self.marks.borrow_mut().remove(&self.index);
    }
}

/// evaluates condition sets against external state
///
/// the engine is single-threaded: caches, clock and the re-entrancy marks use
/// `Cell`/`RefCell`, so evaluation takes `&self` and nested checks can call back
/// in. hosts that evaluate from several threads keep one engine per thread or
/// wrap it in a `Mutex`.
pub struct ConditionEngine {
    registry: Arc<ConditionRegistry>,
    policy: CachePolicy,
    sets: Vec<ConditionSet>,
    run_time: Cell<f64>,
    check_cache: RefCell<CheckCache>,
    set_cache: RefCell<SetCache>,
    /// sets currently being evaluated; empty between top-level calls
    in_progress: RefCell<HashSet<usize>>,
    /// raised when a re-entered set handed back its fallback; leaves whose
    /// check saw this are not cached
    reentered: Cell<bool>,
}

impl ConditionEngine {
    pub fn new(registry: Arc<ConditionRegistry>, policy: CachePolicy) -> Self {
        Self {
            registry,
            policy,
            sets: Vec::new(),
            run_time: Cell::new(0.0),
            check_cache: RefCell::new(CheckCache::new()),
            set_cache: RefCell::new(SetCache::new()),
            in_progress: RefCell::new(HashSet::new()),
            reentered: Cell::new(false),
        }
    }

    /// builder form of `set_condition_sets`
    pub fn with_condition_sets(mut self, sets: Vec<ConditionSet>) -> Self {
        self.set_condition_sets(sets);
        self
    }

    pub fn registry(&self) -> &ConditionRegistry {
        &self.registry
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
        self.clear_caches();
    }

    /// replace the set collection (config load, import)
    ///
    /// unknown condition ids are reported here, once, rather than on every
    /// evaluation
    pub fn set_condition_sets(&mut self, sets: Vec<ConditionSet>) {
        self.sets = sets;
        for (index, set) in self.sets.iter().enumerate() {
            for issue in self.validate_set(set) {
                tracing::warn!(set = index, name = %set.name, "{}", issue);
            }
        }
        self.clear_caches();
    }

    pub fn condition_sets(&self) -> &[ConditionSet] {
        &self.sets
    }

    /// mutable access for editors; cached results are dropped since indices
    /// and contents may change
    pub fn condition_sets_mut(&mut self) -> &mut Vec<ConditionSet> {
        self.clear_caches();
        &mut self.sets
    }

    pub fn condition_set(&self, index: i64) -> Option<&ConditionSet> {
        self.resolve_index(index).map(|i| &self.sets[i])
    }

    pub fn run_time(&self) -> f64 {
        self.run_time.get()
    }

    /// advance the clock; called once per frame by the host
    pub fn set_run_time(&self, run_time: f64) {
        let current = self.run_time.get();
        if !run_time.is_finite() {
            tracing::debug!(current, run_time, "ignoring non-finite run time");
            return;
        }
        if run_time < current {
            tracing::debug!(current, run_time, "ignoring run time that moves backwards");
            return;
        }
        self.run_time.set(run_time);
    }

    /// drop all cached results, including committed set values
    pub fn clear_caches(&self) {
        self.check_cache.borrow_mut().clear();
        self.set_cache.borrow_mut().clear();
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            checks: self.check_cache.borrow().stats(),
            sets: self.set_cache.borrow().stats(),
        }
    }

    /// check a single condition; unknown ids are `false` and never cached
    pub fn check_condition(&self, id: &str, arg: &ConditionArg, state: &dyn GameState) -> bool {
        let ctx = CheckContext {
            engine: self,
            state,
        };
        self.check_leaf(&ctx, id, arg)
    }

    /// evaluate a set value that is not addressed by index
    ///
    /// leaves are cached as usual but the set result is not, since a bare
    /// value has no identity to key it by
    pub fn check_condition_set(&self, set: &ConditionSet, state: &dyn GameState) -> bool {
        let ctx = CheckContext {
            engine: self,
            state,
        };
        self.fold(&ctx, set)
    }

    /// evaluate the set at `index`; an index with no set is `true`
    pub fn check_condition_set_index(&self, index: i64, state: &dyn GameState) -> bool {
        let Some(index) = self.resolve_index(index) else {
            return true;
        };
        let ctx = CheckContext {
            engine: self,
            state,
        };
        self.evaluate_indexed(&ctx, index)
    }

    /// edit/import time checks for a set against this engine's registry and collection
    pub fn validate_set(&self, set: &ConditionSet) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for (position, cref) in set.conditions.iter().enumerate() {
            if !self.registry.contains(&cref.id) {
                issues.push(ValidationIssue::UnknownCondition {
                    position,
                    id: cref.id.clone(),
                    suggestion: self.registry.suggest(&cref.id).map(str::to_string),
                });
                continue;
            }
            if cref.id == CONDITION_SET_ID {
                if let Some(index) = cref.arg.as_int() {
                    if self.resolve_index(index).is_none() {
                        issues.push(ValidationIssue::SetIndexOutOfRange { position, index });
                    }
                }
            }
        }
        issues
    }

    fn resolve_index(&self, index: i64) -> Option<usize> {
        usize::try_from(index).ok().filter(|&i| i < self.sets.len())
    }

    fn check_leaf(&self, ctx: &CheckContext<'_>, id: &str, arg: &ConditionArg) -> bool {
        let now = self.run_time.get();
        {
            let mut cache = self.check_cache.borrow_mut();
            cache.refresh(now, self.policy.effective_window());
            if let Some(value) = cache.get(id, arg) {
                return value;
            }
        }

        let Some(condition) = self.registry.get_condition(id) else {
            return false;
        };
        // the cache must not be borrowed here: the check may evaluate nested sets
        let outer = self.reentered.replace(false);
        let value = condition.check(ctx, arg);
        let reentered = self.reentered.get();
        if !reentered {
            self.check_cache.borrow_mut().insert(id, arg, value);
        }
        self.reentered.set(outer || reentered);
        value
    }

    fn fold(&self, ctx: &CheckContext<'_>, set: &ConditionSet) -> bool {
        let mut acc: Option<bool> = None;
        for cref in &set.conditions {
            let Some(condition) = self.registry.get_condition(&cref.id) else {
                continue;
            };
            if !condition.target_exists(ctx, &cref.arg) {
                continue;
            }
            let leaf = self.check_leaf(ctx, &cref.id, &cref.arg) != cref.negate;
            acc = Some(match acc {
                None => leaf,
                Some(prev) => cref.operator.combine(prev, leaf),
            });
        }
        acc.unwrap_or(true)
    }

    fn evaluate_indexed(&self, ctx: &CheckContext<'_>, index: usize) -> bool {
        let now = self.run_time.get();
        {
            let mut cache = self.set_cache.borrow_mut();
            cache.refresh(now, self.policy.effective_window());
            if let Some(value) = cache.get(index) {
                return value;
            }
        }

        let Some(_entered) = Reentry::enter(&self.in_progress, index) else {
            let fallback = self.set_cache.borrow().last_committed(index).unwrap_or(false);
            self.reentered.set(true);
            tracing::trace!(set = index, fallback, "condition set re-entered during evaluation");
            return fallback;
        };

        let value = self.fold(ctx, &self.sets[index]);
        self.set_cache.borrow_mut().commit(index, value);
        value
    }
}

impl std::fmt::Debug for ConditionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionEngine")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("sets", &self.sets.len())
            .field("run_time", &self.run_time.get())
            .finish_non_exhaustive()
    }
}
