mod edit;
mod schema;

pub use edit::{add_condition_set, move_condition_set, remove_condition_set};
pub use schema::{CacheSettings, Config, Settings, DEFAULT_CACHE_WINDOW_MS, DEFAULT_LOG_LEVEL};

use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::bars::Bar;
use crate::conditions::{
    parse_days, parse_time_ranges, ConditionEngine, ConditionRef, ConditionRegistry, ConditionSet,
    Operator,
};
use crate::state::flags;

pub const CONFIG_ENV_VAR: &str = "BARCOND_CONFIG";

/// resolve the config path: explicit override, then BARCOND_CONFIG, then ~/.barcond/config.json
pub fn get_config_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not find home directory"))?
        .join(".barcond")
        .join("config.json"))
}

/// load a config; a missing file is an empty config, not an error
///
/// the file is read as JSON5 so hand-edited configs may carry comments and
/// trailing commas
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = json5::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        sets = config.condition_sets.len(),
        bars = config.bars.len(),
        "config loaded"
    );
    Ok(config)
}

pub fn save(config: &Config, path: &Path) -> Result<()> {
    // ensure directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
    }

    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(())
}

/// build an engine over the config's sets with its cache policy
pub fn engine_from_config(config: &Config, registry: Arc<ConditionRegistry>) -> ConditionEngine {
    ConditionEngine::new(registry, config.settings.cache.policy())
        .with_condition_sets(config.condition_sets.clone())
}

/// check a config against a registry and return every problem found
pub fn verify(config: &Config, registry: Arc<ConditionRegistry>) -> Vec<String> {
    let mut errors = Vec::new();

    // validate without the import-time warnings
    let mut engine = ConditionEngine::new(registry, config.settings.cache.policy());
    *engine.condition_sets_mut() = config.condition_sets.clone();

    for (i, set) in config.condition_sets.iter().enumerate() {
        let prefix = format!("condition_sets[{}] '{}'", i, set.name);

        for issue in engine.validate_set(set) {
            errors.push(format!("{}: {}", prefix, issue));
        }

        for (position, cref) in set.conditions.iter().enumerate() {
            if let Some(e) = validate_argument(cref) {
                errors.push(format!("{}: condition {}: {}", prefix, position, e));
            }
        }
    }

    for (i, bar) in config.bars.iter().enumerate() {
        if let Some(index) = bar.condition_set {
            if engine.condition_set(index).is_none() {
                errors.push(format!(
                    "bars[{}] '{}': condition set {} does not exist",
                    i, bar.name, index
                ));
            }
        }
    }

    let cache = &config.settings.cache;
    if cache.enabled && cache.window_ms == 0 {
        errors.push(
            "settings.cache: enabled with window_ms 0, results are never reused".to_string(),
        );
    }

    errors
}

/// argument shape checks for the conditions that parse their argument
fn validate_argument(cref: &ConditionRef) -> Option<String> {
    match cref.id.as_str() {
        "lt" => match cref.arg.as_str() {
            Some(spec) if parse_time_ranges(spec).is_some() => None,
            Some(spec) => Some(format!("invalid time range '{}'", spec)),
            None => Some("lt expects a string like \"9:00-17:00\"".to_string()),
        },
        "wd" => match cref.arg.as_str() {
            Some(spec) if parse_days(spec).is_some() => None,
            Some(spec) => Some(format!("invalid day spec '{}'", spec)),
            None => Some("wd expects a string like \"mon-fri\"".to_string()),
        },
        "cs" if cref.arg.as_int().is_none() => {
            Some("cs expects an integer set index".to_string())
        }
        _ => None,
    }
}

pub fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["settings", "cache", "enabled"] => {
            config.settings.cache.enabled = parse_bool(value)?;
        }
        ["settings", "cache", "window_ms"] => {
            config.settings.cache.window_ms = value
                .parse()
                .with_context(|| format!("Invalid number: {}", value))?;
        }
        ["settings", "log_level"] => {
            config.settings.log_level = value.to_string();
        }
        _ => {
            return Err(anyhow!(
                "Unknown config key: {}. Valid keys: settings.cache.enabled, settings.cache.window_ms, settings.log_level",
                key
            ));
        }
    }

    Ok(())
}

/// generates a config with a few common sets and bars using them
pub fn default_with_examples() -> Config {
    let in_combat = flags::IN_COMBAT as i64;

    Config {
        condition_sets: vec![
            ConditionSet::new("Out of Combat").with(ConditionRef::new("cf", in_combat).negated()),
            // any of three zones
            ConditionSet::new("Housing Districts")
                .with(ConditionRef::new("z", 339i64))
                .with(ConditionRef::new("z", 340i64).with_operator(Operator::Or))
                .with(ConditionRef::new("z", 341i64).with_operator(Operator::Or)),
            ConditionSet::new("Work Hours")
                .with(ConditionRef::new("wd", "mon-fri"))
                .with(ConditionRef::new("lt", "9:00-17:00")),
            ConditionSet::new("Idle at Home")
                .with(ConditionRef::new("cs", 0i64))
                .with(ConditionRef::new("cs", 1i64)),
        ],
        bars: vec![
            Bar::new("Main"),
            Bar::new("Emotes").with_condition_set(3),
            Bar::new("Utility").with_condition_set(0),
        ],
        settings: Settings::default(),
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(anyhow!(
            "Invalid boolean value: {}. Use true/false, yes/no, 1/0, or on/off",
            value
        )),
    }
}
