// shared utilities for integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// path to the barcond binary built for this test run
pub fn barcond_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_barcond"))
}

/// a scratch directory holding a config and a state snapshot
pub struct TestEnv {
    dir: TempDir,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create test directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    pub fn write_config(&self, config: &serde_json::Value) -> PathBuf {
        let path = self.config_path();
        fs::write(&path, serde_json::to_string_pretty(config).unwrap())
            .expect("Failed to write test config");
        path
    }

    pub fn write_config_raw(&self, content: &str) -> PathBuf {
        let path = self.config_path();
        fs::write(&path, content).expect("Failed to write test config");
        path
    }

    pub fn write_state(&self, state: &serde_json::Value) -> PathBuf {
        let path = self.state_path();
        fs::write(&path, serde_json::to_string(state).unwrap())
            .expect("Failed to write test state");
        path
    }

    pub fn read_config(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.config_path()).expect("Failed to read config");
        serde_json::from_str(&content).expect("Config is not valid JSON")
    }

    /// run barcond against this env's config
    ///
    /// `--no-json` is added unless the args ask for JSON, since stdout is piped
    /// in tests and would otherwise switch to JSON output
    pub fn run(&self, args: &[&str]) -> Output {
        let config = self.config_path();
        let mut cmd_args = vec!["--config", config.to_str().unwrap()];
        if !args.iter().any(|a| *a == "--json" || *a == "-j") {
            cmd_args.push("--no-json");
        }
        cmd_args.extend(args);

        Command::new(barcond_binary_path())
            .args(&cmd_args)
            .env_remove("RUST_LOG")
            .env_remove("BARCOND_CONFIG")
            .output()
            .expect("Failed to run barcond")
    }
}

/// a config with the sets most tests need
///
/// 0: out of combat, 1: zone 100/200/300, 2: references 0 and 1, 3: references itself
pub fn sample_config() -> serde_json::Value {
    serde_json::json!({
        "condition_sets": [
            {
                "name": "Out of Combat",
                "conditions": [ { "id": "cf", "arg": { "int": 26 }, "negate": true } ]
            },
            {
                "name": "Cities",
                "conditions": [
                    { "id": "z", "arg": { "int": 100 } },
                    { "id": "z", "arg": { "int": 200 }, "operator": "or" },
                    { "id": "z", "arg": { "uint64": 300 }, "operator": "or" }
                ]
            },
            {
                "name": "Idle in City",
                "conditions": [
                    { "id": "cs", "arg": { "int": 0 } },
                    { "id": "cs", "arg": { "int": 1 } }
                ]
            },
            {
                "name": "Loop",
                "conditions": [ { "id": "cs", "arg": { "int": 3 } } ]
            }
        ],
        "bars": [
            { "name": "Main" },
            { "name": "Emotes", "condition_set": 2 },
            { "name": "Combat", "condition_set": 0 }
        ],
        "settings": { "cache": { "enabled": true, "window_ms": 100 } }
    })
}

/// stdout as a string
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// stderr as a string
#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// parse JSON output, unwrapping the JSON-RPC result
pub fn parse_json_output(output: &Output) -> serde_json::Value {
    let stdout = stdout(output);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("Failed to parse JSON output: {}\nOutput was: {}", e, stdout));

    if json.get("jsonrpc").is_some() && json.get("result").is_some() {
        json["result"].clone()
    } else {
        json
    }
}
