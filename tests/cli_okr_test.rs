//! Integration tests for `rot okr` commands.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_okr_with_key_results() {
    let env = TestEnv::init();
    let objective = env.json(&["okr", "create", "Grow activation", "-q", "Q3", "-y", "2024"]);
    let id = objective["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("okr-"));
    assert_eq!(objective["quarter"], "Q3");

    let kr = env.json(&["okr", "kr-add", &id, "Weekly signups", "--target", "500", "--start", "100"]);
    let kr_id = kr["id"].as_str().unwrap().to_string();
    assert_eq!(kr["progress"], 0);

    let kr = env.json(&["okr", "kr-update", &kr_id, "--current", "400"]);
    assert_eq!(kr["progress"], 75);
    assert_eq!(kr["current_value"], 400.0);

    let detail = env.json(&["okr", "show", &id]);
    assert_eq!(detail["progress"]["percentage"], 75);
    assert_eq!(detail["key_results"].as_array().unwrap().len(), 1);
}

#[test]
fn test_okr_list_filters_by_period() {
    let env = TestEnv::init();
    env.json(&["okr", "create", "Q1 goal", "-q", "1", "-y", "2025"]);
    env.json(&["okr", "create", "Q2 goal", "-q", "Q2", "-y", "2025"]);

    assert_eq!(env.json(&["okr", "list"])["count"], 2);
    assert_eq!(env.json(&["okr", "list", "-q", "Q2"])["count"], 1);
    assert_eq!(env.json(&["okr", "list", "-y", "2024"])["count"], 0);
}

#[test]
fn test_okr_links_items_and_delete_unlinks() {
    let env = TestEnv::init();
    let id = env.json(&["okr", "create", "Retention", "-q", "Q1", "-y", "2025"])["id"]
        .as_str()
        .unwrap()
        .to_string();
    let item = env.create_item(&["Win-back emails", "--objective", &id]);

    let detail = env.json(&["okr", "show", &id]);
    assert_eq!(detail["items"][0]["id"], item.as_str());

    env.json(&["okr", "delete", &id]);
    let shown = env.json(&["item", "show", &item]);
    assert!(shown.get("objective_id").is_none());
}

#[test]
fn test_okr_human_output() {
    let env = TestEnv::init();
    env.json(&["okr", "create", "Grow activation", "-q", "Q3", "-y", "2024"]);
    env.rot()
        .args(["okr", "list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 objective(s):"))
        .stdout(predicate::str::contains("Grow activation"));
}

#[test]
fn test_kr_add_to_missing_objective() {
    let env = TestEnv::init();
    env.rot()
        .args(["okr", "kr-add", "okr-0000", "KR", "--target", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Objective not found"));
}
