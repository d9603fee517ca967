//! built-in conditions
//!
//! one explicit table; ids are persisted in user config and must never be
//! reused for a different meaning.

use std::sync::Arc;

use regex::RegexBuilder;

use super::engine::CheckContext;
use super::registry::{Condition, ConditionCategory, ConditionRegistry, RegistryBuilder};
use super::time::{day_spec_matches, time_spec_matches};
use super::types::ConditionArg;

/// id of the condition that evaluates another set by index
pub const CONDITION_SET_ID: &str = "cs";

lazy_static::lazy_static! {
    static ref BUILTIN_REGISTRY: Arc<ConditionRegistry> = match builtin_conditions().build() {
        Ok(registry) => Arc::new(registry),
        Err(e) => panic!("built-in condition table is invalid: {}", e),
    };
}

/// the process-wide registry, built on first use
pub fn builtin_registry() -> Arc<ConditionRegistry> {
    BUILTIN_REGISTRY.clone()
}

/// the built-in table as a builder, so hosts can append their own conditions
pub fn builtin_conditions() -> RegistryBuilder {
    ConditionRegistry::builder()
        .category(ConditionCategory::new("player", "Player", 0))
        .category(ConditionCategory::new("location", "Location", 1))
        .category(ConditionCategory::new("time", "Time", 2))
        .category(ConditionCategory::new("misc", "Misc", 3))
        // player
        .condition(Condition::new("cf", "Condition Flag", "player", 0, check_flag))
        .condition(Condition::new("j", "Job", "player", 1, check_job))
        .condition(Condition::new("r", "Role", "player", 2, check_role))
        .condition(Condition::new("lv", "Level", "player", 3, check_level))
        // location
        .condition(Condition::new("z", "Zone", "location", 0, check_zone))
        // time
        .condition(Condition::new("lt", "Local Time", "time", 0, check_local_time))
        .condition(Condition::new("wd", "Weekday", "time", 1, check_weekday))
        // misc
        .condition(Condition::new("hl", "HUD Layout", "misc", 0, check_hud_layout))
        .condition(Condition::new("pl", "Plugin", "misc", 1, check_plugin))
        .condition(condition_set_condition("misc", 2))
}

/// the set-reference condition, for registries assembled outside this table
///
/// a reference to a set that does not exist is left out of the fold; an
/// argument that is not an integer is a plain `false`
pub fn condition_set_condition(category: &str, priority: i32) -> Condition {
    Condition::new(
        CONDITION_SET_ID,
        "Condition Set",
        category,
        priority,
        |ctx, arg| {
            arg.as_int()
                .map_or(false, |index| ctx.check_condition_set(index))
        },
    )
    .with_exists(|ctx, arg| arg.as_int().map_or(true, |index| ctx.has_condition_set(index)))
}

fn check_flag(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_u32().map_or(false, |flag| ctx.state().flag(flag))
}

fn check_job(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_u32().map_or(false, |job| ctx.state().job() == job)
}

fn check_role(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_u32().map_or(false, |role| ctx.state().role() == role)
}

fn check_level(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_u32().map_or(false, |level| ctx.state().level() >= level)
}

fn check_zone(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_u64().map_or(false, |zone| ctx.state().zone() == zone)
}

fn check_hud_layout(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_u32()
        .map_or(false, |layout| ctx.state().hud_layout() == layout)
}

fn check_local_time(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_str()
        .map_or(false, |spec| time_spec_matches(spec, &ctx.state().local_time()))
}

fn check_weekday(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    arg.as_str()
        .map_or(false, |spec| day_spec_matches(spec, &ctx.state().local_time()))
}

fn check_plugin(ctx: &CheckContext<'_>, arg: &ConditionArg) -> bool {
    let Some(pattern) = arg.as_str() else {
        return false;
    };
    let plugins = ctx.state().plugins();
    match parse_regex_pattern(pattern) {
        Some((regex, case_insensitive)) => {
            let Ok(re) = RegexBuilder::new(regex)
                .case_insensitive(case_insensitive)
                .build()
            else {
                return false;
            };
            plugins.iter().any(|p| re.is_match(p))
        }
        None => plugins.iter().any(|p| p.eq_ignore_ascii_case(pattern)),
    }
}

/// split "/expr/flags" into the expression and whether `i` was given
fn parse_regex_pattern(pattern: &str) -> Option<(&str, bool)> {
    let body = pattern.strip_prefix('/')?;
    let end = body.rfind('/')?;
    if end == 0 {
        return None;
    }
    Some((&body[..end], body[end + 1..].contains('i')))
}
