//! Common test utilities for rot integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/roteiro/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `workspace_dir`: The directory rot runs in
/// - `data_dir`: Holds rot's data (via `ROT_DATA_DIR` env var)
///
/// The `rot()` method returns a `Command` that sets `ROT_DATA_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub workspace_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            workspace_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new environment and initialize an open workspace (no users).
    pub fn init() -> Self {
        let env = Self::new();
        env.rot().args(["system", "init"]).assert().success();
        env
    }

    /// Create a new environment whose first admin is `email`.
    pub fn init_with_admin(email: &str) -> Self {
        let env = Self::new();
        env.rot()
            .args(["system", "init", "--admin", email])
            .assert()
            .success();
        env
    }

    /// A Command for the rot binary with an isolated data directory.
    pub fn rot(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_rot"));
        cmd.current_dir(self.workspace_dir.path());
        cmd.env("ROT_DATA_DIR", self.data_dir.path());
        cmd.env_remove("ROT_USER");
        cmd.env_remove("ROT_WORKSPACE");
        cmd.env_remove("ROT_LOG");
        cmd
    }

    /// Run a command that must succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.rot().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "rot {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        parse_json(&output.stdout)
    }

    /// Create an item and return its ID.
    pub fn create_item(&self, args: &[&str]) -> String {
        let mut full = vec!["item", "create"];
        full.extend_from_slice(args);
        self.json(&full)["id"].as_str().unwrap().to_string()
    }

    pub fn path(&self) -> &Path {
        self.workspace_dir.path()
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// The workspace's storage directory inside the data dir.
    pub fn storage_root(&self) -> PathBuf {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(self.data_path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        assert_eq!(dirs.len(), 1, "expected exactly one storage directory");
        dirs.remove(0)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse JSON output from a command.
pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("Failed to parse JSON output")
}
