// integration tests for the config command

use crate::common::*;

const SET_NOT_FOUND: i32 = 8;
const CONFIG_ERROR: i32 = 5;

fn setup() -> TestEnv {
    let env = TestEnv::new();
    env.write_config(&sample_config());
    env
}

fn set_names(config: &serde_json::Value) -> Vec<String> {
    config["condition_sets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect()
}

fn bar_sets(config: &serde_json::Value) -> Vec<Option<i64>> {
    config["bars"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["condition_set"].as_i64())
        .collect()
}

#[test]
fn test_config_path_uses_override() {
    let env = setup();
    let output = env.run(&["config", "path"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        env.config_path().to_str().unwrap()
    );
}

#[test]
fn test_config_show_json() {
    let env = setup();
    let output = env.run(&["config", "show", "--json"]);
    assert!(output.status.success());

    let json = parse_json_output(&output);
    assert_eq!(json["condition_sets"].as_array().unwrap().len(), 4);
    assert_eq!(json["settings"]["log_level"], "warn");
}

#[test]
fn test_config_show_missing_file_is_default() {
    let env = TestEnv::new();
    let output = env.run(&["config", "show", "--json"]);
    assert!(output.status.success());
    let json = parse_json_output(&output);
    assert!(json["condition_sets"].as_array().unwrap().is_empty());
}

#[test]
fn test_config_accepts_json5() {
    let env = TestEnv::new();
    env.write_config_raw(
        r#"{
            // comments and trailing commas are fine
            condition_sets: [
                { name: "Mounted", conditions: [ { id: "cf", arg: { int: 4 } }, ], },
            ],
        }"#,
    );
    let output = env.run(&["config", "verify"]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
    assert!(stdout(&output).contains("Configuration is valid"));
}

#[test]
fn test_config_verify_valid() {
    let env = setup();
    let output = env.run(&["config", "verify", "--json"]);
    assert!(output.status.success());
    assert_eq!(parse_json_output(&output)["valid"], true);
}

#[test]
fn test_config_verify_reports_every_problem() {
    let env = TestEnv::new();
    env.write_config(&serde_json::json!({
        "condition_sets": [
            {
                "name": "Broken",
                "conditions": [
                    { "id": "zn", "arg": { "int": 1 } },
                    { "id": "cs", "arg": { "int": 7 } },
                    { "id": "lt", "arg": { "string": "9-" } }
                ]
            }
        ],
        "bars": [ { "name": "Main", "condition_set": 3 } ]
    }));

    let output = env.run(&["config", "verify"]);
    assert_eq!(output.status.code(), Some(CONFIG_ERROR));

    let text = stdout(&output);
    assert!(text.contains("4 error(s)"));
    assert!(text.contains("unknown id 'zn' (did you mean 'z'?)"));
    assert!(text.contains("condition set index 7 does not exist"));
    assert!(text.contains("invalid time range '9-'"));
    assert!(text.contains("bars[0] 'Main'"));
}

#[test]
fn test_config_verify_json_details() {
    let env = TestEnv::new();
    env.write_config(&serde_json::json!({
        "bars": [ { "name": "Main", "condition_set": 0 } ]
    }));

    let output = env.run(&["config", "verify", "--json"]);
    assert_eq!(output.status.code(), Some(CONFIG_ERROR));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["error"]["code"], -32005);
    assert_eq!(json["error"]["data"]["details"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_verify_missing_file() {
    let env = TestEnv::new();
    let output = env.run(&["config", "verify"]);
    assert_eq!(output.status.code(), Some(CONFIG_ERROR));
}

#[test]
fn test_config_set_value() {
    let env = setup();
    let output = env.run(&["config", "set", "settings.cache.window_ms", "250"]);
    assert!(output.status.success());
    assert_eq!(env.read_config()["settings"]["cache"]["window_ms"], 250);

    let output = env.run(&["config", "set", "settings.nope", "1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown config key"));
}

#[test]
fn test_config_remove_set_reindexes() {
    let env = setup();
    let output = env.run(&["config", "remove-set", "0"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Removed condition set 0 'Out of Combat'"));

    let config = env.read_config();
    assert_eq!(set_names(&config), vec!["Cities", "Idle in City", "Loop"]);
    // Emotes pointed at 2 (now 1), Combat pointed at the removed set
    assert_eq!(bar_sets(&config), vec![None, Some(1), None]);

    // Idle in City lost its cs(0) leaf and cs(1) became cs(0)
    let idle = &config["condition_sets"][1]["conditions"];
    assert_eq!(idle.as_array().unwrap().len(), 1);
    assert_eq!(idle[0]["arg"]["int"], 0);

    // Loop follows itself from 3 to 2
    assert_eq!(config["condition_sets"][2]["conditions"][0]["arg"]["int"], 2);
}

#[test]
fn test_config_remove_set_keeps_bar_on_next_set() {
    let env = setup();
    let output = env.run(&["config", "remove-set", "1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let config = env.read_config();
    assert_eq!(set_names(&config), vec!["Out of Combat", "Idle in City", "Loop"]);
    // Emotes used Idle in City, which moved from 2 to 1
    assert_eq!(bar_sets(&config), vec![None, Some(1), Some(0)]);
}

#[test]
fn test_config_move_set_reindexes() {
    let env = setup();
    let output = env.run(&["config", "move-set", "0", "3", "--json"]);
    assert!(output.status.success());
    assert_eq!(parse_json_output(&output)["name"], "Out of Combat");

    let config = env.read_config();
    assert_eq!(
        set_names(&config),
        vec!["Cities", "Idle in City", "Loop", "Out of Combat"]
    );
    assert_eq!(bar_sets(&config), vec![None, Some(1), Some(3)]);

    let idle = &config["condition_sets"][1]["conditions"];
    assert_eq!(idle[0]["arg"]["int"], 3);
    assert_eq!(idle[1]["arg"]["int"], 0);
}

#[test]
fn test_config_edit_out_of_range() {
    let env = setup();
    let output = env.run(&["config", "remove-set", "4"]);
    assert_eq!(output.status.code(), Some(SET_NOT_FOUND));

    let output = env.run(&["config", "move-set", "1", "9"]);
    assert_eq!(output.status.code(), Some(SET_NOT_FOUND));

    // untouched
    assert_eq!(env.read_config(), sample_config());
}

#[test]
fn test_config_default_is_valid() {
    let env = TestEnv::new();
    let output = env.run(&["config", "default"]);
    assert!(output.status.success());

    let default: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    env.write_config(&default);

    let output = env.run(&["config", "verify"]);
    assert!(output.status.success(), "stdout: {}", stdout(&output));
}
