//! Integration tests for the JSONL action log.

mod common;

use common::TestEnv;
use serde_json::Value;

fn entries(env: &TestEnv) -> Vec<Value> {
    let path = env.storage_root().join("action.log");
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_commands_are_logged() {
    let env = TestEnv::init_with_admin("admin@example.com");
    env.create_item(&["Logged"]);
    env.rot().args(["item", "show", "rm-0000"]).assert().failure();

    let log = entries(&env);
    let create = log.iter().find(|e| e["command"] == "item create").unwrap();
    assert_eq!(create["success"], true);
    assert_eq!(create["user"], "admin@example.com");
    assert_eq!(create["args"]["name"], "Logged");

    let failed = log.iter().find(|e| e["command"] == "item show").unwrap();
    assert_eq!(failed["success"], false);
    assert!(failed["error"].as_str().unwrap().contains("not found"));
}

#[test]
fn test_long_arguments_are_truncated() {
    let env = TestEnv::init();
    let thesis = "x".repeat(150);
    env.create_item(&["Long", "--thesis", &thesis]);

    let log = entries(&env);
    let create = log.iter().find(|e| e["command"] == "item create").unwrap();
    let logged = create["args"]["fields"]["thesis"].as_str().unwrap();
    assert!(logged.ends_with("... (150 chars)"));
    assert_eq!(create["user"], "anonymous");
}

#[test]
fn test_action_log_can_be_disabled() {
    let env = TestEnv::init();
    env.json(&["config", "set", "action-log-enabled", "false"]);
    let before = entries(&env).len();

    env.create_item(&["Unlogged"]);
    env.json(&["item", "list"]);
    assert_eq!(entries(&env).len(), before);
}
