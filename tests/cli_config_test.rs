//! Integration tests for `rot config` commands.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_config_set_and_get() {
    let env = TestEnv::init();
    let unset = env.json(&["config", "get", "default-product"]);
    assert!(unset["value"].is_null());

    let set = env.json(&["config", "set", "default-product", "Web"]);
    assert_eq!(set["value"], "web");
    assert_eq!(env.json(&["config", "get", "default-product"])["value"], "web");
}

#[test]
fn test_config_defaults_apply_to_new_items() {
    let env = TestEnv::init();
    env.json(&["config", "set", "default-product", "app"]);
    env.json(&["config", "set", "default-duration-months", "2"]);

    let id = env.create_item(&["Defaults", "--start", "2024-05-20"]);
    let item = env.json(&["item", "show", &id]);
    assert_eq!(item["product"], "app");
    assert_eq!(item["duration_months"], 2);
    assert_eq!(item["span"][1], "2024-06-30");
}

#[test]
fn test_config_output_format_human() {
    let env = TestEnv::init();
    env.json(&["config", "set", "output-format", "human"]);
    env.rot()
        .args(["user", "list"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{").not());
}

#[test]
fn test_config_list_sources() {
    let env = TestEnv::init();
    env.json(&["config", "set", "default-user", "pm@example.com"]);

    let list = env.json(&["config", "list"]);
    let entries = list["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 5);
    let user = entries.iter().find(|e| e["key"] == "default-user").unwrap();
    assert_eq!(user["effective"], "pm@example.com");
    assert_eq!(user["source"], "session");

    let list = env.json(&["config", "list", "--as", "other@example.com"]);
    let user = list["entries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["key"] == "default-user")
        .unwrap()
        .clone();
    assert_eq!(user["effective"], "other@example.com");
    assert_eq!(user["source"], "cli");
}

#[test]
fn test_config_rejects_bad_values() {
    let env = TestEnv::init();
    env.rot()
        .args(["config", "set", "output-format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("json or human"));
    env.rot()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));
}
