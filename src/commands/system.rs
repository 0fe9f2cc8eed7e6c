//! `rot system` commands.

use serde::Serialize;

use super::{Context, Output, to_json_string, unique_id};
use crate::config::{load_config, save_config};
use crate::models::{Role, User};
use crate::storage::{DB_FILE, USER_PREFIX};
use crate::{Error, Result};

#[derive(Serialize)]
pub struct InitResult {
    /// False when the workspace was already initialized
    pub initialized: bool,
    pub storage_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<User>,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.initialized {
            lines.push(format!("Initialized roteiro at {}", self.storage_path));
        } else {
            lines.push(format!("Already initialized at {}", self.storage_path));
        }
        if let Some(admin) = &self.admin {
            lines.push(format!("Admin: {} (default user)", admin.email));
        }
        lines.join("\n")
    }
}

/// Initialize storage for the workspace, optionally registering the first admin.
pub fn system_init(ctx: &Context, admin: Option<&str>) -> Result<InitResult> {
    let already = ctx.storage_exists()?;
    let mut storage = ctx.init_storage()?;

    let admin = match admin {
        Some(email) => {
            if storage.count_users()? > 0 {
                return Err(Error::AlreadyExists(
                    "Workspace already has users; use `rot user add`".to_string(),
                ));
            }
            let email = super::user::normalize_email(email)?;
            let id = unique_id(USER_PREFIX, &email, |_| Ok(false))?;
            let user = User::new(id, email, Role::Admin);
            storage.add_user(&user)?;

            let mut config = load_config(&storage)?;
            config.default_user = Some(user.email.clone());
            save_config(&storage, &config)?;
            tracing::info!(email = %user.email, "registered first admin");
            Some(user)
        }
        None => None,
    };

    Ok(InitResult {
        initialized: !already,
        storage_path: storage.root().display().to_string(),
        admin,
    })
}

#[derive(Serialize)]
pub struct SystemInfo {
    pub version: String,
    pub build_timestamp: String,
    pub git_commit: String,
    pub workspace: String,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<EntityCounts>,
}

#[derive(Serialize)]
pub struct EntityCounts {
    pub items: usize,
    pub objectives: usize,
    pub requests: usize,
    pub users: usize,
    pub sprints: usize,
}

impl Output for SystemInfo {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("rot {} ({} built {})", self.version, self.git_commit, self.build_timestamp),
            format!("Workspace: {}", self.workspace),
        ];
        match (&self.database, &self.counts) {
            (Some(db), Some(c)) => {
                lines.push(format!("Database: {}", db));
                lines.push(format!(
                    "{} items, {} objectives, {} requests, {} users, {} sprints",
                    c.items, c.objectives, c.requests, c.users, c.sprints
                ));
            }
            _ => lines.push("Not initialized (run `rot system init`)".to_string()),
        }
        lines.join("\n")
    }
}

/// Report build information and what the workspace holds.
pub fn system_info(ctx: &Context) -> Result<SystemInfo> {
    let mut info = SystemInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_timestamp: env!("ROT_BUILD_TIMESTAMP").to_string(),
        git_commit: env!("ROT_GIT_COMMIT").to_string(),
        workspace: ctx.workspace.display().to_string(),
        initialized: false,
        database: None,
        counts: None,
    };

    if !ctx.storage_exists()? {
        return Ok(info);
    }
    let storage = ctx.open_storage()?;
    info.initialized = true;
    info.database = Some(storage.root().join(DB_FILE).display().to_string());
    info.counts = Some(EntityCounts {
        items: storage.list_items()?.len(),
        objectives: storage.list_objectives(None, None)?.len(),
        requests: storage.list_requests(None, None)?.len(),
        users: storage.count_users()?,
        sprints: storage.list_sprints()?.len(),
    });
    Ok(info)
}
