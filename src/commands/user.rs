//! `rot user` commands.

use serde::Serialize;

use super::{Context, Output, to_json_string, unique_id};
use crate::models::{Role, User};
use crate::storage::{USER_PREFIX, parse_role};
use crate::{Error, Result};

/// Trim, lowercase and sanity-check an email address.
pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(Error::InvalidInput(format!("Invalid email: {}", email)));
    }
    Ok(email)
}

#[derive(Serialize)]
pub struct UserResult {
    #[serde(flatten)]
    pub user: User,
}

impl Output for UserResult {
    fn to_json(&self) -> String {
        to_json_string(&self.user)
    }

    fn to_human(&self) -> String {
        format_user(&self.user)
    }
}

fn format_user(user: &User) -> String {
    match &user.name {
        Some(name) => format!("{} {} <{}> [{}]", user.id, name, user.email, user.role),
        None => format!("{} {} [{}]", user.id, user.email, user.role),
    }
}

/// Register a user. Requires admin.
pub fn user_add(ctx: &Context, email: &str, name: Option<String>, role: &str) -> Result<UserResult> {
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Admin)?;

    let email = normalize_email(email)?;
    let role = parse_role(role)?;
    let users = storage.list_users()?;
    let id = unique_id(USER_PREFIX, &email, |id| {
        Ok(users.iter().any(|u| u.id == id))
    })?;

    let mut user = User::new(id, email, role);
    user.name = super::non_empty(name);
    storage.add_user(&user)?;
    tracing::info!(email = %user.email, role = %user.role, "added user");
    Ok(UserResult { user })
}

#[derive(Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub count: usize,
}

impl Output for UserList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.users.is_empty() {
            return "No users.".to_string();
        }
        let mut lines = vec![format!("{} user(s):", self.count)];
        lines.extend(self.users.iter().map(|u| format!("  {}", format_user(u))));
        lines.join("\n")
    }
}

pub fn user_list(ctx: &Context) -> Result<UserList> {
    let storage = ctx.open_storage()?;
    let users = storage.list_users()?;
    Ok(UserList {
        count: users.len(),
        users,
    })
}

/// Change a user's role. Requires admin; the last admin cannot be demoted.
pub fn user_role(ctx: &Context, email: &str, role: &str) -> Result<UserResult> {
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Admin)?;

    let role = parse_role(role)?;
    let target = storage.get_user_by_email(email)?;
    if target.role == Role::Admin && role != Role::Admin {
        let admins = storage
            .list_users()?
            .iter()
            .filter(|u| u.role == Role::Admin)
            .count();
        if admins <= 1 {
            return Err(Error::InvalidInput(format!(
                "Cannot demote {}: it is the last admin",
                target.email
            )));
        }
    }

    let user = storage.set_user_role(&target.email, role)?;
    tracing::info!(email = %user.email, role = %user.role, "changed user role");
    Ok(UserResult { user })
}
