//! catalog of condition implementations
//!
//! the registry is assembled once from an explicit table (see `builtin`) and is
//! read-only afterwards. lookups are by stable string id; enumeration is grouped
//! by category and ordered by priority, which only matters for UI listing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strsim::levenshtein;
use thiserror::Error;

use super::engine::CheckContext;
use super::types::ConditionArg;

/// predicate over external state and an argument
pub type CheckFn = Arc<dyn Fn(&CheckContext<'_>, &ConditionArg) -> bool + Send + Sync>;

/// reports whether the thing an argument points at exists at all; a leaf
/// whose target does not exist is left out of the fold instead of folding `false`
pub type ExistsFn = Arc<dyn Fn(&CheckContext<'_>, &ConditionArg) -> bool + Send + Sync>;

/// max edit distance for "did you mean" suggestions
const SUGGESTION_DISTANCE: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate condition id '{id}' ({first} and {second})")]
    DuplicateCondition {
        id: String,
        first: String,
        second: String,
    },
    #[error("duplicate category id '{id}'")]
    DuplicateCategory { id: String },
    #[error("condition '{condition}' names unknown category '{category}'")]
    UnknownCategory { condition: String, category: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionCategory {
    pub id: String,
    pub display_name: String,
    pub priority: i32,
}

impl ConditionCategory {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            priority,
        }
    }
}

/// a registered condition
#[derive(Clone)]
pub struct Condition {
    pub id: String,
    pub display_name: String,
    pub category: String,
    /// UI ordering within the category
    pub priority: i32,
    check: CheckFn,
    exists: Option<ExistsFn>,
}

impl Condition {
    pub fn new<F>(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: impl Into<String>,
        priority: i32,
        check: F,
    ) -> Self
    where
        F: Fn(&CheckContext<'_>, &ConditionArg) -> bool + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category: category.into(),
            priority,
            check: Arc::new(check),
            exists: None,
        }
    }

    pub fn with_exists<F>(mut self, exists: F) -> Self
    where
        F: Fn(&CheckContext<'_>, &ConditionArg) -> bool + Send + Sync + 'static,
    {
        self.exists = Some(Arc::new(exists));
        self
    }

    /// run the predicate
    pub fn check(&self, ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
        (self.check)(ctx, arg)
    }

    /// does the argument's target resolve; conditions without a hook always do
    pub fn target_exists(&self, ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
        self.exists.as_ref().map_or(true, |exists| exists(ctx, arg))
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// collects categories and conditions, rejecting duplicates on `build`
#[derive(Default)]
pub struct RegistryBuilder {
    categories: Vec<ConditionCategory>,
    conditions: Vec<Condition>,
}

impl RegistryBuilder {
    pub fn category(mut self, category: ConditionCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn build(self) -> Result<ConditionRegistry, RegistryError> {
        let mut groups: Vec<(ConditionCategory, Vec<Condition>)> = Vec::new();
        for category in self.categories {
            if groups.iter().any(|(c, _)| c.id == category.id) {
                return Err(RegistryError::DuplicateCategory { id: category.id });
            }
            groups.push((category, Vec::new()));
        }

        let mut seen: HashMap<String, String> = HashMap::new();
        for condition in self.conditions {
            if let Some(first) = seen.get(&condition.id) {
                return Err(RegistryError::DuplicateCondition {
                    id: condition.id.clone(),
                    first: first.clone(),
                    second: condition.display_name.clone(),
                });
            }
            let Some((_, members)) = groups.iter_mut().find(|(c, _)| c.id == condition.category)
            else {
                return Err(RegistryError::UnknownCategory {
                    condition: condition.id,
                    category: condition.category,
                });
            };
            seen.insert(condition.id.clone(), condition.display_name.clone());
            members.push(condition);
        }

        groups.sort_by(|(a, _), (b, _)| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        for (_, members) in &mut groups {
            members.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        }

        let mut index = HashMap::new();
        for (group, (_, members)) in groups.iter().enumerate() {
            for (slot, condition) in members.iter().enumerate() {
                index.insert(condition.id.clone(), (group, slot));
            }
        }

        tracing::debug!(
            categories = groups.len(),
            conditions = index.len(),
            "condition registry built"
        );

        Ok(ConditionRegistry { groups, index })
    }
}

/// immutable id -> condition catalog
pub struct ConditionRegistry {
    groups: Vec<(ConditionCategory, Vec<Condition>)>,
    index: HashMap<String, (usize, usize)>,
}

impl ConditionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get_condition(&self, id: &str) -> Option<&Condition> {
        self.index
            .get(id)
            .map(|&(group, slot)| &self.groups[group].1[slot])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get_category(&self, id: &str) -> Option<&ConditionCategory> {
        self.groups.iter().map(|(c, _)| c).find(|c| c.id == id)
    }

    /// categories with their conditions, both in priority order
    pub fn enumerate(&self) -> impl Iterator<Item = (&ConditionCategory, &[Condition])> + '_ {
        self.groups
            .iter()
            .map(|(category, members)| (category, members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// closest registered id to an unknown one, for import/verify messages
    pub fn suggest(&self, id: &str) -> Option<&str> {
        let needle = id.to_lowercase();
        self.index
            .keys()
            .map(|known| (known, levenshtein(&needle, &known.to_lowercase())))
            .filter(|(_, distance)| *distance <= SUGGESTION_DISTANCE)
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(known, _)| known.as_str())
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("categories", &self.groups.len())
            .field("conditions", &self.index.len())
            .finish()
    }
}
