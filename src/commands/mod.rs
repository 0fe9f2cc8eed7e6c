//! Command implementations for the rot CLI.
//!
//! This module contains the business logic for each CLI command.
//! Commands are organized by entity type:
//! - `system` - Initialize a workspace and report build/storage info
//! - `item` - Roadmap item CRUD and bulk delete
//! - `roadmap` - The quarter view
//! - `okr` - Objectives and key results
//! - `request` - Feature requests and voting
//! - `user` - Users and roles
//! - `sprint` - Sprint records and performance
//! - `config` - Workspace preferences
//!
//! Every command takes a [`Context`] and returns a value implementing
//! [`Output`].

mod config;
mod item;
mod okr;
mod request;
mod roadmap;
mod sprint;
mod system;
mod user;

pub use config::*;
pub use item::*;
pub use okr::*;
pub use request::*;
pub use roadmap::*;
pub use sprint::*;
pub use system::*;
pub use user::*;

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{ConfigOverrides, ResolvedConfig, resolve_config};
use crate::models::{Role, User};
use crate::storage::{Storage, generate_id};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize a command result, falling back to an empty object.
pub(crate) fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

/// Where and as whom a command runs.
#[derive(Debug, Clone)]
pub struct Context {
    /// Workspace directory the storage is keyed on
    pub workspace: PathBuf,
    /// Explicit data root; `None` uses `ROT_DATA_DIR` or the platform data dir
    pub data_dir: Option<PathBuf>,
    /// Email given with `--as`
    pub actor: Option<String>,
}

impl Context {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            data_dir: None,
            actor: None,
        }
    }

    pub fn with_data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = Some(data_dir);
        self
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn open_storage(&self) -> Result<Storage> {
        match &self.data_dir {
            Some(dir) => Storage::open_with_data_dir(&self.workspace, dir),
            None => Storage::open(&self.workspace),
        }
    }

    pub fn init_storage(&self) -> Result<Storage> {
        match &self.data_dir {
            Some(dir) => Storage::init_with_data_dir(&self.workspace, dir),
            None => Storage::init(&self.workspace),
        }
    }

    pub fn storage_exists(&self) -> Result<bool> {
        match &self.data_dir {
            Some(dir) => Storage::exists_with_data_dir(&self.workspace, dir),
            None => Storage::exists(&self.workspace),
        }
    }

    /// Resolve configuration for this invocation.
    pub fn config(&self, storage: &Storage) -> Result<ResolvedConfig> {
        let mut overrides = ConfigOverrides::new();
        if let Some(actor) = &self.actor {
            overrides = overrides.with_user(actor.clone());
        }
        resolve_config(storage, &overrides)
    }

    /// Identify the acting user.
    pub fn actor(&self, storage: &Storage) -> Result<Actor> {
        let config = self.config(storage)?;
        let open_workspace = storage.count_users()? == 0;
        let Some(email) = config.user() else {
            return Ok(Actor {
                email: None,
                user: None,
                open_workspace,
            });
        };
        let user = storage.find_user_by_email(email)?;
        if user.is_none() {
            tracing::debug!(email, "acting user is not registered");
        }
        Ok(Actor {
            email: Some(email.trim().to_lowercase()),
            user,
            open_workspace,
        })
    }

    /// Identify the acting user and check it holds at least `required`.
    pub fn require_role(&self, storage: &Storage, required: Role) -> Result<Actor> {
        let actor = self.actor(storage)?;
        actor.require(required)?;
        Ok(actor)
    }
}

/// The user a command acts as.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Resolved email, registered or not
    pub email: Option<String>,
    /// The registered user, if the email matched one
    pub user: Option<User>,
    /// No users are registered yet; role checks are not enforced
    pub open_workspace: bool,
}

impl Actor {
    /// Effective role. Unknown and anonymous actors are viewers.
    pub fn role(&self) -> Role {
        if self.open_workspace {
            return Role::Admin;
        }
        self.user.as_ref().map(|u| u.role).unwrap_or_default()
    }

    pub fn require(&self, required: Role) -> Result<()> {
        let actual = self.role();
        if actual.allows(required) {
            Ok(())
        } else {
            Err(Error::PermissionDenied { required, actual })
        }
    }

    /// The registered user, or an error naming what is missing.
    pub fn known_user(&self) -> Result<&User> {
        match (&self.user, &self.email) {
            (Some(user), _) => Ok(user),
            (None, Some(email)) => Err(Error::NotFound(format!("User not found: {}", email))),
            (None, None) => Err(Error::InvalidInput(
                "This command needs a registered user (use --as <email> or set ROT_USER)"
                    .to_string(),
            )),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// Draw ids until one is free.
pub(crate) fn unique_id(
    prefix: &str,
    seed: &str,
    taken: impl Fn(&str) -> Result<bool>,
) -> Result<String> {
    for attempt in 0..32 {
        let id = generate_id(prefix, &format!("{}#{}", seed, attempt));
        if !taken(&id)? {
            return Ok(id);
        }
    }
    Err(Error::Other(format!(
        "Could not allocate a unique '{}' id",
        prefix
    )))
}

/// Map a lookup result to whether the entity exists.
pub(crate) fn exists<T>(lookup: Result<T>) -> Result<bool> {
    match lookup {
        Ok(_) => Ok(true),
        Err(Error::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Trim a free-text argument; empty becomes `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
