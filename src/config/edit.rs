//! editing the condition set collection
//!
//! a set is addressed by its index everywhere: by bars and by condition-set
//! refs inside other sets. removing or moving a set shifts indices, so every
//! referrer is rewritten in the same operation.

use anyhow::{anyhow, Result};

use super::schema::Config;
use crate::conditions::{ConditionArg, ConditionSet, CONDITION_SET_ID};

/// append a set and return its index
pub fn add_condition_set(config: &mut Config, set: ConditionSet) -> usize {
    config.condition_sets.push(set);
    config.condition_sets.len() - 1
}

/// remove the set at `index`
///
/// bars that used it lose their condition (and become always visible); refs
/// to it inside other sets are dropped. every reference above it is shifted
/// down, including ones that already pointed past the end.
pub fn remove_condition_set(config: &mut Config, index: usize) -> Result<ConditionSet> {
    if index >= config.condition_sets.len() {
        return Err(anyhow!(
            "condition set {} does not exist ({} sets)",
            index,
            config.condition_sets.len()
        ));
    }
    let removed = config.condition_sets.remove(index);
    let index = index as i64;

    // drop references to the removed set before shifting the later ones down
    for set in &mut config.condition_sets {
        set.conditions
            .retain(|c| !(c.id == CONDITION_SET_ID && c.arg.as_int() == Some(index)));
    }
    for bar in &mut config.bars {
        if bar.condition_set == Some(index) {
            tracing::info!(bar = %bar.name, "bar condition set removed");
            bar.condition_set = None;
        }
    }
    remap_references(config, |old| {
        if old > index {
            Some(old - 1)
        } else {
            None
        }
    });

    Ok(removed)
}

/// move the set at `from` so it ends up at `to`, shifting the sets in between
pub fn move_condition_set(config: &mut Config, from: usize, to: usize) -> Result<()> {
    let len = config.condition_sets.len();
    if from >= len || to >= len {
        return Err(anyhow!(
            "cannot move condition set {} to {} ({} sets)",
            from,
            to,
            len
        ));
    }
    if from == to {
        return Ok(());
    }

    let set = config.condition_sets.remove(from);
    config.condition_sets.insert(to, set);

    let (from, to) = (from as i64, to as i64);
    remap_references(config, |old| {
        if old == from {
            Some(to)
        } else if from < to && old > from && old <= to {
            Some(old - 1)
        } else if to < from && old >= to && old < from {
            Some(old + 1)
        } else {
            None
        }
    });
    Ok(())
}

/// rewrite every set index in bars and condition-set refs; `remap` returns
/// the new index, or `None` to leave the reference as is
fn remap_references(config: &mut Config, remap: impl Fn(i64) -> Option<i64>) {
    for set in &mut config.condition_sets {
        for cref in &mut set.conditions {
            if cref.id != CONDITION_SET_ID {
                continue;
            }
            if let Some(new) = cref.arg.as_int().and_then(&remap) {
                cref.arg = ConditionArg::Int(new);
            }
        }
    }
    for bar in &mut config.bars {
        if let Some(new) = bar.condition_set.and_then(&remap) {
            bar.condition_set = Some(new);
        }
    }
}
