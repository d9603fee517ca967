use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use std::fs;
use std::path::{Path, PathBuf};

use crate::conditions::{builtin_registry, ConditionArg, ConditionRegistry, EngineStats};
use crate::config::{self, Config};
use crate::state::StateSnapshot;

use super::exit_codes;
use super::output::{self, OutputMode};

/// upper bound for `check --repeat`
const MAX_REPEAT: i64 = 10_000;

#[derive(Parser)]
#[command(name = "barcond")]
#[command(about = "Evaluate the condition sets that decide when bars are shown")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides BARCOND_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log more to stderr (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered conditions by category
    List {
        /// Only show one category (id or display name)
        #[arg(long)]
        category: Option<String>,

        /// Output one condition id per line (ideal for piping to fzf/xargs)
        #[arg(long)]
        names: bool,
    },

    /// Evaluate a condition set from the config against a state snapshot
    Check {
        /// Condition set index
        index: usize,

        /// Path to a JSON state snapshot
        #[arg(short, long)]
        state: PathBuf,

        /// Evaluate this many frames, advancing the run time between them
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_REPEAT))]
        repeat: u32,

        /// Run time added per frame, in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },

    /// Evaluate a single condition against a state snapshot
    CheckCondition {
        /// Condition id (see `barcond list`)
        id: String,

        /// Integer argument
        #[arg(long, conflicts_with_all = ["uint", "string"])]
        int: Option<i64>,

        /// Unsigned 64-bit argument
        #[arg(long, conflicts_with = "string")]
        uint: Option<u64>,

        /// String argument
        #[arg(long)]
        string: Option<String>,

        /// Path to a JSON state snapshot
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Show which configured bars are visible for a state snapshot
    Bars {
        /// Path to a JSON state snapshot
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "settings.cache.window_ms")
        key: String,
        /// Value to set
        value: String,
    },
    /// Show a configuration with example condition sets and bars
    Default,
    /// Verify configuration file for errors
    Verify,
    /// Remove a condition set and re-index everything that refers to later sets
    RemoveSet {
        /// Condition set index
        index: usize,
    },
    /// Move a condition set to another position, re-indexing its referrers
    MoveSet {
        /// Current index
        from: usize,
        /// New index
        to: usize,
    },
}

// JSON output structs

#[derive(Serialize)]
struct ListResponse<T: Serialize> {
    items: Vec<T>,
}

#[derive(Serialize)]
struct CategorySummary {
    id: String,
    name: String,
    conditions: Vec<ConditionSummary>,
}

#[derive(Serialize)]
struct ConditionSummary {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct FrameResult {
    run_time: f64,
    result: bool,
}

#[derive(Serialize)]
struct CheckResponse {
    index: usize,
    name: String,
    expression: String,
    result: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    frames: Vec<FrameResult>,
    stats: EngineStats,
}

#[derive(Serialize)]
struct ConditionResponse {
    id: String,
    arg: ConditionArg,
    result: bool,
}

#[derive(Serialize)]
struct BarSummary {
    name: String,
    condition_set: Option<i64>,
    visible: bool,
}

#[derive(Serialize)]
struct ConfigEditResponse {
    action: &'static str,
    name: String,
    sets: usize,
}

/// report an error in the current output mode and exit with `code`
fn fail(mode: OutputMode, code: i32, message: &str, suggestions: Vec<String>) -> ! {
    if mode.is_json() {
        output::print_json_error_with_suggestions(code, message, suggestions);
    } else {
        eprintln!("Error: {}", message);
        if !suggestions.is_empty() {
            eprintln!("Did you mean: {}?", suggestions.join(", "));
        }
    }
    std::process::exit(code);
}

/// unwrap a loaded config or exit with CONFIG_ERROR
fn require_config(loaded: Result<Config>, mode: OutputMode) -> Config {
    match loaded {
        Ok(config) => config,
        Err(e) => fail(mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e), Vec::new()),
    }
}

/// read a state snapshot (JSON5) or exit with INVALID_ARGS
fn require_state(path: &Path, mode: OutputMode) -> StateSnapshot {
    match load_state(path) {
        Ok(state) => state,
        Err(e) => fail(mode, exit_codes::INVALID_ARGS, &format!("{:#}", e), Vec::new()),
    }
}

fn load_state(path: &Path) -> Result<StateSnapshot> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    json5::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))
}

fn condition_arg(int: Option<i64>, uint: Option<u64>, string: Option<String>) -> ConditionArg {
    int.map(ConditionArg::Int)
        .or(uint.map(ConditionArg::UInt64))
        .or(string.map(ConditionArg::String))
        .unwrap_or_default()
}

fn list_categories(registry: &ConditionRegistry, category: Option<&str>) -> Vec<CategorySummary> {
    registry
        .enumerate()
        .filter(|(c, _)| {
            category.map_or(true, |wanted| {
                c.id.eq_ignore_ascii_case(wanted) || c.display_name.eq_ignore_ascii_case(wanted)
            })
        })
        .map(|(c, conditions)| CategorySummary {
            id: c.id.clone(),
            name: c.display_name.clone(),
            conditions: conditions
                .iter()
                .map(|cond| ConditionSummary {
                    id: cond.id.clone(),
                    name: cond.display_name.clone(),
                })
                .collect(),
        })
        .collect()
}

pub fn execute(cli: Cli, config_path: &Path, loaded: Result<Config>) -> Result<()> {
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false);
    let registry = builtin_registry();

    match cli.command {
        Commands::List { category, names } => {
            let list_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, names);
            let items = list_categories(&registry, category.as_deref());

            if items.is_empty() {
                let known = registry.enumerate().map(|(c, _)| c.id.clone()).collect();
                let message = format!("unknown category '{}'", category.unwrap_or_default());
                fail(list_mode, exit_codes::INVALID_ARGS, &message, known);
            }

            match list_mode {
                OutputMode::Json => output::print_json(&ListResponse { items }),
                OutputMode::Names => {
                    for condition in items.iter().flat_map(|c| &c.conditions) {
                        println!("{}", condition.id);
                    }
                }
                OutputMode::Text => {
                    for category in &items {
                        println!("{}", category.name);
                        for condition in &category.conditions {
                            println!("  {:<4} {}", condition.id, condition.name);
                        }
                    }
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Check {
            index,
            state,
            repeat,
            frame_ms,
        } => {
            let config = require_config(loaded, output_mode);
            let state = require_state(&state, output_mode);

            let Some(set) = config.condition_sets.get(index) else {
                let message = format!(
                    "condition set {} not found ({} configured)",
                    index,
                    config.condition_sets.len()
                );
                fail(output_mode, exit_codes::SET_NOT_FOUND, &message, Vec::new());
            };

            let engine = config::engine_from_config(&config, registry);
            let mut frames = Vec::with_capacity(repeat as usize);
            for frame in 0..repeat {
                let run_time = frame as f64 * frame_ms as f64 / 1000.0;
                engine.set_run_time(run_time);
                let result = engine.check_condition_set_index(index as i64, &state);
                tracing::debug!(frame, run_time, result, "evaluated condition set {}", index);
                frames.push(FrameResult { run_time, result });
            }

            let result = frames.last().map_or(true, |f| f.result);
            if repeat == 1 {
                frames.clear();
            }
            let response = CheckResponse {
                index,
                name: set.name.clone(),
                expression: set.to_string(),
                result,
                frames,
                stats: engine.stats(),
            };

            match output_mode {
                OutputMode::Json => output::print_json(&response),
                OutputMode::Quiet => {}
                _ => {
                    println!("[{}] {}: {}", response.index, response.name, response.result);
                    println!("  {}", response.expression);
                    for (i, frame) in response.frames.iter().enumerate() {
                        println!("  frame {} ({:.3}s): {}", i, frame.run_time, frame.result);
                    }
                }
            }
            Ok(())
        }

        Commands::CheckCondition {
            id,
            int,
            uint,
            string,
            state,
        } => {
            if !registry.contains(&id) {
                let suggestions = registry.suggest(&id).map(str::to_string).into_iter().collect();
                let message = format!("unknown condition '{}'", id);
                fail(output_mode, exit_codes::INVALID_ARGS, &message, suggestions);
            }

            let config = require_config(loaded, output_mode);
            let state = require_state(&state, output_mode);
            let arg = condition_arg(int, uint, string);

            let engine = config::engine_from_config(&config, registry);
            let result = engine.check_condition(&id, &arg, &state);

            match output_mode {
                OutputMode::Json => output::print_json(&ConditionResponse { id, arg, result }),
                OutputMode::Quiet => {}
                _ => println!("{}({}): {}", id, arg, result),
            }
            Ok(())
        }

        Commands::Bars { state } => {
            let config = require_config(loaded, output_mode);
            let state = require_state(&state, output_mode);
            let engine = config::engine_from_config(&config, registry);

            let items: Vec<BarSummary> = config
                .bars
                .iter()
                .map(|bar| BarSummary {
                    name: bar.name.clone(),
                    condition_set: bar.condition_set,
                    visible: bar.is_visible(&engine, &state),
                })
                .collect();

            match output_mode {
                OutputMode::Json => output::print_json(&ListResponse { items }),
                OutputMode::Quiet => {}
                _ => {
                    if items.is_empty() {
                        println!("No bars configured");
                    }
                    for bar in &items {
                        let shown = if bar.visible { "visible" } else { "hidden" };
                        match bar.condition_set {
                            Some(index) => println!("{}: {} (set {})", bar.name, shown, index),
                            None => println!("{}: {}", bar.name, shown),
                        }
                    }
                }
            }
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = require_config(loaded, output_mode);
                if output_mode.is_json() {
                    output::print_json(&config);
                } else if !output_mode.is_quiet() {
                    let json = serde_json::to_string_pretty(&config)
                        .context("Failed to serialize config")?;
                    println!("{}", json);
                }
                Ok(())
            }
            ConfigCommands::Path => {
                println!("{}", config_path.display());
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut config = require_config(loaded, output_mode);
                config::set_value(&mut config, &key, &value)?;
                config::save(&config, config_path)?;
                if !output_mode.is_quiet() {
                    println!("Set {} = {}", key, value);
                }
                Ok(())
            }
            ConfigCommands::Default => {
                let config = config::default_with_examples();
                let json =
                    serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{}", json);
                Ok(())
            }
            ConfigCommands::Verify => {
                if !config_path.exists() {
                    let message = format!("config file not found: {}", config_path.display());
                    fail(output_mode, exit_codes::CONFIG_ERROR, &message, Vec::new());
                }
                let config = require_config(loaded, output_mode);
                let errors = config::verify(&config, registry);

                if errors.is_empty() {
                    if output_mode.is_json() {
                        output::print_json(&serde_json::json!({
                            "path": config_path.display().to_string(),
                            "valid": true,
                        }));
                    } else if !output_mode.is_quiet() {
                        println!("✓ Configuration is valid: {}", config_path.display());
                    }
                    return Ok(());
                }

                if output_mode.is_json() {
                    output::print_json_error_with_details(
                        exit_codes::CONFIG_ERROR,
                        "configuration validation failed",
                        errors,
                    );
                } else {
                    println!(
                        "✗ Configuration has {} error(s): {}",
                        errors.len(),
                        config_path.display()
                    );
                    println!();
                    for error in &errors {
                        println!("  - {}", error);
                    }
                }
                std::process::exit(exit_codes::CONFIG_ERROR);
            }
            ConfigCommands::RemoveSet { index } => {
                let mut config = require_config(loaded, output_mode);
                let removed = match config::remove_condition_set(&mut config, index) {
                    Ok(set) => set,
                    Err(e) => fail(output_mode, exit_codes::SET_NOT_FOUND, &e.to_string(), Vec::new()),
                };
                config::save(&config, config_path)?;

                let response = ConfigEditResponse {
                    action: "remove_set",
                    name: removed.name,
                    sets: config.condition_sets.len(),
                };
                match output_mode {
                    OutputMode::Json => output::print_json(&response),
                    OutputMode::Quiet => {}
                    _ => println!("Removed condition set {} '{}'", index, response.name),
                }
                Ok(())
            }
            ConfigCommands::MoveSet { from, to } => {
                let mut config = require_config(loaded, output_mode);
                if let Err(e) = config::move_condition_set(&mut config, from, to) {
                    fail(output_mode, exit_codes::SET_NOT_FOUND, &e.to_string(), Vec::new());
                }
                config::save(&config, config_path)?;

                let name = config
                    .condition_sets
                    .get(to)
                    .map(|s| s.name.clone())
                    .ok_or_else(|| anyhow!("condition set {} missing after move", to))?;
                let response = ConfigEditResponse {
                    action: "move_set",
                    name,
                    sets: config.condition_sets.len(),
                };
                match output_mode {
                    OutputMode::Json => output::print_json(&response),
                    OutputMode::Quiet => {}
                    _ => println!("Moved condition set '{}' from {} to {}", response.name, from, to),
                }
                Ok(())
            }
        },
    }
}
