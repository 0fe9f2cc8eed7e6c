//! Roteiro - A roadmap, OKR and feature request tracker.
//!
//! This library provides the core functionality for the `rot` CLI tool:
//! the roadmap placement and ordering engine, OKR and sprint models,
//! feature request voting, role-gated commands and local storage.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod roadmap;
pub mod storage;

use models::Role;


/// Library-level error type for Roteiro operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not initialized: run `rot system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: requires {required} role, current role is {actual}")]
    PermissionDenied { required: Role, actual: Role },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Roteiro operations.
pub type Result<T> = std::result::Result<T, Error>;
