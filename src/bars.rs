//! bars: the main consumer of condition sets
//!
//! a bar shows when its condition set evaluates to true. a bar without a set,
//! or pointing at a set that no longer exists, always shows.

use serde::{Deserialize, Serialize};

use crate::conditions::ConditionEngine;
use crate::state::GameState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub name: String,
    /// index into the condition set collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_set: Option<i64>,
}

impl Bar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition_set: None,
        }
    }

    pub fn with_condition_set(mut self, index: i64) -> Self {
        self.condition_set = Some(index);
        self
    }

    pub fn is_visible(&self, engine: &ConditionEngine, state: &dyn GameState) -> bool {
        match self.condition_set {
            Some(index) => engine.check_condition_set_index(index, state),
            None => true,
        }
    }
}
