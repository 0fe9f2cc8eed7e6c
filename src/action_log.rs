//! Action logging for rot commands.
//!
//! Every command run against an initialized workspace is appended to
//! `action.log` in the workspace's storage directory, one JSON object per line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Log file name inside a workspace's storage directory.
pub const ACTION_LOG_FILE: &str = "action.log";

const REDACTED: &str = "[REDACTED]";
const MAX_STRING_LEN: usize = 100;
const MAX_ARRAY_LEN: usize = 20;
const SENSITIVE_WORDS: [&str; 4] = ["password", "token", "secret", "key"];

/// A single action log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub timestamp: DateTime<Utc>,

    /// Workspace the command ran against
    pub workspace: String,

    /// Command name (e.g. "item create", "roadmap")
    pub command: String,

    /// Command arguments, redacted
    pub args: Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,

    /// Acting user email, or "anonymous"
    pub user: String,
}

impl ActionLog {
    pub fn new(workspace: &Path, command: &str, args: &Value, user: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now(),
            workspace: workspace.to_string_lossy().to_string(),
            command: command.to_string(),
            args: redact_args(args),
            success: true,
            error: None,
            duration_ms: 0,
            user: user.unwrap_or("anonymous").to_string(),
        }
    }

    /// Record the command outcome.
    pub fn finish(mut self, error: Option<String>, duration_ms: u64) -> Self {
        self.success = error.is_none();
        self.error = error;
        self.duration_ms = duration_ms;
        self
    }
}

/// Path of the action log under a storage root.
pub fn log_path(storage_root: &Path) -> PathBuf {
    storage_root.join(ACTION_LOG_FILE)
}

/// Append an entry to the workspace action log.
///
/// Failures are reported through `tracing` and never propagated.
pub fn log_action(storage_root: &Path, entry: &ActionLog) {
    let path = log_path(storage_root);
    if let Err(e) = append_entry(&path, entry) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write action log");
    }
}

fn append_entry(path: &Path, entry: &ActionLog) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

/// Read all entries from a log file, skipping malformed lines.
pub fn read_entries(storage_root: &Path) -> std::io::Result<Vec<ActionLog>> {
    let path = log_path(storage_root);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn is_sensitive(key: &str) -> bool {
    key.to_lowercase()
        .split(['_', '-'])
        .any(|part| SENSITIVE_WORDS.contains(&part))
}

/// Redact sensitive fields and shorten long values.
pub fn redact_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if is_sensitive(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_args(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) if items.len() > MAX_ARRAY_LEN => {
            Value::String(format!("[{} items]", items.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_args).collect()),
        Value::String(s) => {
            let len = s.chars().count();
            if len > MAX_STRING_LEN {
                let head: String = s.chars().take(MAX_STRING_LEN - 3).collect();
                Value::String(format!("{}... ({} chars)", head, len))
            } else {
                args.clone()
            }
        }
        _ => args.clone(),
    }
}
