//! Storage layer for Roteiro data.
//!
//! Each workspace gets its own data directory under
//! `~/.local/share/roteiro/<workspace-hash>/` (or `$ROT_DATA_DIR/<workspace-hash>/`):
//!
//! - `roteiro.db` - SQLite database holding every entity
//! - `config.kdl` - user preferences (see [`crate::config`])
//! - `action.log` - JSONL audit trail (see [`crate::action_log`])
//!
//! Updates are last-write-wins per row. Rows are mapped to typed models on
//! read, with the lenient normalization rules from [`crate::models`] applied
//! to statuses, durations, dates and product tags.

use crate::models::{
    FeatureRequest, ItemStatus, KeyResult, Objective, RequestStatus, RoadmapItem, Role, Sprint,
    User, normalize_months, normalize_tag, parse_start_date,
};
use crate::roadmap::BulkDelete;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "ROT_DATA_DIR";

/// Database file name inside a workspace's storage directory.
pub const DB_FILE: &str = "roteiro.db";

/// ID prefix for roadmap items.
pub const ITEM_PREFIX: &str = "rm";
/// ID prefix for objectives.
pub const OBJECTIVE_PREFIX: &str = "okr";
/// ID prefix for key results.
pub const KEY_RESULT_PREFIX: &str = "kr";
/// ID prefix for feature requests.
pub const REQUEST_PREFIX: &str = "req";
/// ID prefix for users.
pub const USER_PREFIX: &str = "usr";
/// ID prefix for sprints.
pub const SPRINT_PREFIX: &str = "spr";

const ITEM_COLUMNS: &str = "id, name, status, start_date, duration_months, metric, thesis, \
     product, sub_product, objective_id, created_at, updated_at";

const REQUEST_COLUMNS: &str = "r.id, r.title, r.description, r.product, r.status, r.author, \
     r.created_at, (SELECT COUNT(*) FROM request_votes v WHERE v.request_id = r.id) AS votes";

/// Storage manager for a single workspace.
pub struct Storage {
    /// Root directory for this workspace's data
    pub root: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open existing storage for the given workspace.
    pub fn open(workspace: &Path) -> Result<Self> {
        Self::open_at(get_storage_dir(workspace)?)
    }

    /// Initialize storage for a new workspace. Safe to call on an existing one.
    pub fn init(workspace: &Path) -> Result<Self> {
        Self::init_at(get_storage_dir(workspace)?)
    }

    /// Check if storage exists for the given workspace.
    pub fn exists(workspace: &Path) -> Result<bool> {
        let root = get_storage_dir(workspace)?;
        Ok(root.join(DB_FILE).exists())
    }

    /// Open storage under an explicit data root.
    pub fn open_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<Self> {
        Self::open_at(storage_dir_under(data_dir, workspace)?)
    }

    /// Initialize storage under an explicit data root.
    pub fn init_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<Self> {
        Self::init_at(storage_dir_under(data_dir, workspace)?)
    }

    /// Check if storage exists under an explicit data root.
    pub fn exists_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<bool> {
        Ok(storage_dir_under(data_dir, workspace)?.join(DB_FILE).exists())
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        let db_path = root.join(DB_FILE);
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "opened storage");
        Ok(Self { root, conn })
    }

    fn init_at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        let db_path = root.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "initialized storage");
        Ok(Self { root, conn })
    }

    /// Get the storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS objectives (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                quarter INTEGER NOT NULL,
                year INTEGER NOT NULL,
                owner TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS key_results (
                id TEXT PRIMARY KEY,
                objective_id TEXT NOT NULL,
                title TEXT NOT NULL,
                start_value REAL NOT NULL DEFAULT 0,
                target_value REAL NOT NULL,
                current_value REAL NOT NULL DEFAULT 0,
                unit TEXT,
                FOREIGN KEY (objective_id) REFERENCES objectives(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS roadmap_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'not_started',
                start_date TEXT,
                duration_months,
                metric TEXT,
                thesis TEXT,
                product TEXT,
                sub_product TEXT,
                objective_id TEXT REFERENCES objectives(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT,
                role TEXT NOT NULL DEFAULT 'viewer',
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS requests (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                product TEXT,
                status TEXT NOT NULL DEFAULT 'open',
                author TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS request_votes (
                request_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                voted_at TEXT NOT NULL,
                PRIMARY KEY (request_id, user_id),
                FOREIGN KEY (request_id) REFERENCES requests(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS sprints (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                planned_points INTEGER NOT NULL DEFAULT 0,
                delivered_points INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_items_status ON roadmap_items(status);
            CREATE INDEX IF NOT EXISTS idx_items_product ON roadmap_items(product);
            CREATE INDEX IF NOT EXISTS idx_key_results_objective ON key_results(objective_id);
            CREATE INDEX IF NOT EXISTS idx_objectives_period ON objectives(year, quarter);
            CREATE INDEX IF NOT EXISTS idx_requests_status ON requests(status);
            CREATE INDEX IF NOT EXISTS idx_votes_user ON request_votes(user_id);
            "#,
        )?;

        Self::run_migrations(conn)?;

        Ok(())
    }

    /// Run database migrations for schema changes.
    fn run_migrations(conn: &Connection) -> Result<()> {
        // Migration: databases created before items could link to objectives.
        // SQLite doesn't support IF NOT EXISTS for ALTER TABLE, so we check the schema first
        let has_objective_id: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('roadmap_items') WHERE name = 'objective_id'",
            [],
            |row| row.get(0),
        )?;

        if !has_objective_id {
            conn.execute(
                "ALTER TABLE roadmap_items ADD COLUMN objective_id TEXT \
                 REFERENCES objectives(id) ON DELETE SET NULL",
                [],
            )?;
        }

        Ok(())
    }

    // === Roadmap Item Operations ===

    /// Create a new roadmap item.
    pub fn create_item(&mut self, item: &RoadmapItem) -> Result<()> {
        if let Some(objective_id) = &item.objective_id {
            self.get_objective(objective_id)?;
        }
        self.conn.execute(
            &format!(
                "INSERT INTO roadmap_items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                ITEM_COLUMNS
            ),
            params![
                item.id,
                item.name,
                item.status.as_str(),
                item.start_date.map(|d| d.to_string()),
                item.duration_months,
                item.metric,
                item.thesis,
                item.product,
                item.sub_product,
                item.objective_id,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        tracing::debug!(id = %item.id, "created roadmap item");
        Ok(())
    }

    /// Get a roadmap item by ID.
    pub fn get_item(&self, id: &str) -> Result<RoadmapItem> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM roadmap_items WHERE id = ?1", ITEM_COLUMNS),
                [id],
                row_to_item,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Roadmap item not found: {}", id)))
    }

    /// List all roadmap items in creation order.
    pub fn list_items(&self) -> Result<Vec<RoadmapItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM roadmap_items ORDER BY created_at ASC, id ASC",
            ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map([], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Update a roadmap item. The stored row is replaced wholesale.
    pub fn update_item(&mut self, item: &RoadmapItem) -> Result<()> {
        if let Some(objective_id) = &item.objective_id {
            self.get_objective(objective_id)?;
        }
        let changed = self.conn.execute(
            r#"
            UPDATE roadmap_items SET
                name = ?2, status = ?3, start_date = ?4, duration_months = ?5, metric = ?6,
                thesis = ?7, product = ?8, sub_product = ?9, objective_id = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                item.id,
                item.name,
                item.status.as_str(),
                item.start_date.map(|d| d.to_string()),
                item.duration_months,
                item.metric,
                item.thesis,
                item.product,
                item.sub_product,
                item.objective_id,
                item.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Roadmap item not found: {}", item.id)));
        }
        tracing::debug!(id = %item.id, "updated roadmap item");
        Ok(())
    }

    /// Delete a roadmap item by ID.
    pub fn delete_item(&mut self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM roadmap_items WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Roadmap item not found: {}", id)));
        }
        tracing::debug!(id, "deleted roadmap item");
        Ok(())
    }

    /// Delete every item in `batch` in a single transaction.
    ///
    /// Ids that no longer exist are skipped. Returns the number of rows removed.
    pub fn delete_items(&mut self, batch: &BulkDelete) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM roadmap_items WHERE id = ?1")?;
            for id in batch.ids() {
                removed += stmt.execute([id])?;
            }
        }
        tx.commit()?;
        tracing::debug!(requested = batch.len(), removed, "bulk deleted roadmap items");
        Ok(removed)
    }

    // === Objective Operations ===

    /// Create a new objective.
    pub fn create_objective(&mut self, objective: &Objective) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO objectives
            (id, title, description, quarter, year, owner, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                objective.id,
                objective.title,
                objective.description,
                objective.quarter,
                objective.year,
                objective.owner,
                objective.created_at.to_rfc3339(),
                objective.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get an objective by ID.
    pub fn get_objective(&self, id: &str) -> Result<Objective> {
        self.conn
            .query_row(
                "SELECT id, title, description, quarter, year, owner, created_at, updated_at
                 FROM objectives WHERE id = ?1",
                [id],
                row_to_objective,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Objective not found: {}", id)))
    }

    /// List objectives, optionally restricted to a quarter and/or year.
    pub fn list_objectives(&self, quarter: Option<u8>, year: Option<i32>) -> Result<Vec<Objective>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, quarter, year, owner, created_at, updated_at
             FROM objectives
             WHERE (?1 IS NULL OR quarter = ?1) AND (?2 IS NULL OR year = ?2)
             ORDER BY year ASC, quarter ASC, created_at ASC",
        )?;
        let objectives = stmt
            .query_map(params![quarter, year], row_to_objective)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(objectives)
    }

    /// Update an objective.
    pub fn update_objective(&mut self, objective: &Objective) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE objectives SET
                title = ?2, description = ?3, quarter = ?4, year = ?5, owner = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                objective.id,
                objective.title,
                objective.description,
                objective.quarter,
                objective.year,
                objective.owner,
                objective.updated_at.to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Objective not found: {}", objective.id)));
        }
        Ok(())
    }

    /// Delete an objective, its key results, and unlink any roadmap items.
    pub fn delete_objective(&mut self, id: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE roadmap_items SET objective_id = NULL WHERE objective_id = ?1",
            [id],
        )?;
        tx.execute("DELETE FROM key_results WHERE objective_id = ?1", [id])?;
        let changed = tx.execute("DELETE FROM objectives WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Objective not found: {}", id)));
        }
        tx.commit()?;
        Ok(())
    }

    /// Add a key result to an existing objective.
    pub fn add_key_result(&mut self, kr: &KeyResult) -> Result<()> {
        self.get_objective(&kr.objective_id)?;
        self.conn.execute(
            r#"
            INSERT INTO key_results
            (id, objective_id, title, start_value, target_value, current_value, unit)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                kr.id,
                kr.objective_id,
                kr.title,
                kr.start_value,
                kr.target_value,
                kr.current_value,
                kr.unit,
            ],
        )?;
        Ok(())
    }

    /// Get a key result by ID.
    pub fn get_key_result(&self, id: &str) -> Result<KeyResult> {
        self.conn
            .query_row(
                "SELECT id, objective_id, title, start_value, target_value, current_value, unit
                 FROM key_results WHERE id = ?1",
                [id],
                row_to_key_result,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Key result not found: {}", id)))
    }

    /// Update a key result's values.
    pub fn update_key_result(&mut self, kr: &KeyResult) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE key_results SET
                title = ?2, start_value = ?3, target_value = ?4, current_value = ?5, unit = ?6
            WHERE id = ?1
            "#,
            params![
                kr.id,
                kr.title,
                kr.start_value,
                kr.target_value,
                kr.current_value,
                kr.unit,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Key result not found: {}", kr.id)));
        }
        Ok(())
    }

    /// List the key results of an objective.
    pub fn list_key_results(&self, objective_id: &str) -> Result<Vec<KeyResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, objective_id, title, start_value, target_value, current_value, unit
             FROM key_results WHERE objective_id = ?1 ORDER BY rowid ASC",
        )?;
        let krs = stmt
            .query_map([objective_id], row_to_key_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(krs)
    }

    // === Feature Request Operations ===

    /// Create a new feature request.
    pub fn create_request(&mut self, request: &FeatureRequest) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO requests (id, title, description, product, status, author, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                request.id,
                request.title,
                request.description,
                request.product,
                request.status.as_str(),
                request.author,
                request.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a feature request by ID, with its current vote count.
    pub fn get_request(&self, id: &str) -> Result<FeatureRequest> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM requests r WHERE r.id = ?1", REQUEST_COLUMNS),
                [id],
                row_to_request,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Request not found: {}", id)))
    }

    /// List feature requests, most voted first.
    pub fn list_requests(
        &self,
        product: Option<&str>,
        status: Option<RequestStatus>,
    ) -> Result<Vec<FeatureRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM requests r
             WHERE (?1 IS NULL OR r.product = ?1) AND (?2 IS NULL OR r.status = ?2)
             ORDER BY votes DESC, r.created_at ASC, r.id ASC",
            REQUEST_COLUMNS
        ))?;
        let requests = stmt
            .query_map(
                params![normalize_tag(product), status.map(|s| s.as_str())],
                row_to_request,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    /// Change the status of a feature request.
    pub fn set_request_status(&mut self, id: &str, status: RequestStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE requests SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Request not found: {}", id)));
        }
        Ok(())
    }

    /// Record a vote. Returns `false` if the user had already voted.
    pub fn vote(&mut self, request_id: &str, user_id: &str) -> Result<bool> {
        self.get_request(request_id)?;
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO request_votes (request_id, user_id, voted_at) VALUES (?1, ?2, ?3)",
            params![request_id, user_id, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    /// Withdraw a vote. Returns `false` if there was no vote to remove.
    pub fn unvote(&mut self, request_id: &str, user_id: &str) -> Result<bool> {
        self.get_request(request_id)?;
        let removed = self.conn.execute(
            "DELETE FROM request_votes WHERE request_id = ?1 AND user_id = ?2",
            params![request_id, user_id],
        )?;
        Ok(removed > 0)
    }

    // === User Operations ===

    /// Add a user. Emails are unique.
    pub fn add_user(&mut self, user: &User) -> Result<()> {
        if self.find_user_by_email(&user.email)?.is_some() {
            return Err(Error::AlreadyExists(format!("User already exists: {}", user.email)));
        }
        self.conn.execute(
            "INSERT INTO users (id, email, name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id,
                user.email,
                user.name,
                user.role.as_str(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up a user by email (case-insensitive).
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, name, role, created_at FROM users WHERE email = ?1",
                [email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by email.
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.find_user_by_email(email)?
            .ok_or_else(|| Error::NotFound(format!("User not found: {}", email)))
    }

    /// List users ordered by email.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, name, role, created_at FROM users ORDER BY email ASC")?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    /// Change a user's role and return the updated user.
    pub fn set_user_role(&mut self, email: &str, role: Role) -> Result<User> {
        let mut user = self.get_user_by_email(email)?;
        self.conn.execute(
            "UPDATE users SET role = ?2 WHERE id = ?1",
            params![user.id, role.as_str()],
        )?;
        user.role = role;
        Ok(user)
    }

    /// Count registered users.
    pub fn count_users(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // === Sprint Operations ===

    /// Record a sprint.
    pub fn add_sprint(&mut self, sprint: &Sprint) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sprints (id, name, start_date, end_date, planned_points, delivered_points)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                sprint.id,
                sprint.name,
                sprint.start_date.to_string(),
                sprint.end_date.to_string(),
                sprint.planned_points,
                sprint.delivered_points,
            ],
        )?;
        Ok(())
    }

    /// List sprints in chronological order.
    pub fn list_sprints(&self) -> Result<Vec<Sprint>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, start_date, end_date, planned_points, delivered_points
             FROM sprints ORDER BY start_date ASC, id ASC",
        )?;
        let sprints = stmt
            .query_map([], row_to_sprint)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sprints)
    }

    /// Delete a sprint by ID.
    pub fn delete_sprint(&mut self, id: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM sprints WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Sprint not found: {}", id)));
        }
        Ok(())
    }
}

// === Row Mapping ===

fn conversion_error<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

fn date_at(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, Type::Text, e))
}

/// SQLite is dynamically typed: legacy rows may hold durations as text or
/// reals, so the raw value goes through the same normalization as JSON input.
fn sql_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::Value::from(i),
        Value::Real(f) => serde_json::Value::from(f),
        Value::Text(s) => serde_json::Value::String(s),
        Value::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(&b).into_owned()),
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<RoadmapItem> {
    let status: String = row.get(2)?;
    let start_date: Option<String> = row.get(3)?;
    let duration: Value = row.get(4)?;
    let product: Option<String> = row.get(7)?;
    let sub_product: Option<String> = row.get(8)?;

    Ok(RoadmapItem {
        id: row.get(0)?,
        name: row.get(1)?,
        status: ItemStatus::parse(&status),
        start_date: start_date.as_deref().and_then(parse_start_date),
        duration_months: normalize_months(&sql_to_json(duration)),
        metric: row.get(5)?,
        thesis: row.get(6)?,
        product: normalize_tag(product.as_deref()),
        sub_product: normalize_tag(sub_product.as_deref()),
        objective_id: row.get(9)?,
        created_at: timestamp_at(row, 10)?,
        updated_at: timestamp_at(row, 11)?,
    })
}

fn row_to_objective(row: &Row) -> rusqlite::Result<Objective> {
    Ok(Objective {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        quarter: row.get(3)?,
        year: row.get(4)?,
        owner: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
        updated_at: timestamp_at(row, 7)?,
    })
}

fn row_to_key_result(row: &Row) -> rusqlite::Result<KeyResult> {
    Ok(KeyResult {
        id: row.get(0)?,
        objective_id: row.get(1)?,
        title: row.get(2)?,
        start_value: row.get(3)?,
        target_value: row.get(4)?,
        current_value: row.get(5)?,
        unit: row.get(6)?,
    })
}

fn row_to_request(row: &Row) -> rusqlite::Result<FeatureRequest> {
    let status: String = row.get(4)?;
    let votes: i64 = row.get(7)?;
    Ok(FeatureRequest {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        product: row.get(3)?,
        status: parse_request_status(&status).unwrap_or_else(|_| {
            tracing::warn!(status = %status, "unknown request status, reading as open");
            RequestStatus::Open
        }),
        author: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
        votes: votes as u32,
    })
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(3)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: parse_role(&role).unwrap_or_else(|_| {
            tracing::warn!(role = %role, "unknown role, reading as viewer");
            Role::Viewer
        }),
        created_at: timestamp_at(row, 4)?,
    })
}

fn row_to_sprint(row: &Row) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: date_at(row, 2)?,
        end_date: date_at(row, 3)?,
        planned_points: row.get(4)?,
        delivered_points: row.get(5)?,
    })
}

// === Paths, IDs and Parsing ===

/// Get the storage directory for a workspace.
///
/// Uses `$ROT_DATA_DIR` as the data root when set, otherwise
/// `~/.local/share/roteiro/`.
pub fn get_storage_dir(workspace: &Path) -> Result<PathBuf> {
    let data_root = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::data_dir()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?
            .join("roteiro"),
    };
    storage_dir_under(&data_root, workspace)
}

/// Storage directory for `workspace` under an explicit data root.
pub fn storage_dir_under(data_root: &Path, workspace: &Path) -> Result<PathBuf> {
    let canonical = workspace
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize workspace path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());

    Ok(data_root.join(&hash_hex[..12]))
}

/// Generate a unique ID.
///
/// Format: `<prefix>-<4 hex chars>`, e.g. "rm-a1b2".
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(Utc::now().timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('-')) else {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    };

    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}

/// Parse a roadmap status given on the command line. Unlike stored rows,
/// unknown values are rejected here.
pub fn parse_item_status(s: &str) -> Result<ItemStatus> {
    let status = ItemStatus::parse(s);
    if status.is_known() {
        Ok(status)
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid status: {} (expected one of: not_started, next_sprint, current_sprint, finishing, done)",
            s
        )))
    }
}

/// Parse a feature request status.
pub fn parse_request_status(s: &str) -> Result<RequestStatus> {
    match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
        "open" => Ok(RequestStatus::Open),
        "planned" => Ok(RequestStatus::Planned),
        "in_progress" | "inprogress" => Ok(RequestStatus::InProgress),
        "shipped" | "done" => Ok(RequestStatus::Shipped),
        "declined" | "rejected" => Ok(RequestStatus::Declined),
        _ => Err(Error::InvalidInput(format!("Invalid request status: {}", s))),
    }
}

/// Parse a role name.
pub fn parse_role(s: &str) -> Result<Role> {
    match s.trim().to_lowercase().as_str() {
        "viewer" => Ok(Role::Viewer),
        "editor" => Ok(Role::Editor),
        "admin" => Ok(Role::Admin),
        _ => Err(Error::InvalidInput(format!(
            "Invalid role: {} (expected viewer, editor or admin)",
            s
        ))),
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("Invalid date (expected YYYY-MM-DD): {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roadmap::Selection;
    use crate::test_utils::TestEnv;

    fn item(id: &str, name: &str) -> RoadmapItem {
        RoadmapItem::new(id.to_string(), name.to_string())
    }

    #[test]
    fn test_storage_init_and_exists() {
        let env = TestEnv::new();
        assert!(!Storage::exists_with_data_dir(env.path(), env.data_path()).unwrap());

        let storage = env.init_storage();
        assert!(storage.root().join(DB_FILE).exists());
        assert!(Storage::exists_with_data_dir(env.path(), env.data_path()).unwrap());
    }

    #[test]
    fn test_migration_adds_objective_link() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE roadmap_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'not_started',
                start_date TEXT,
                duration_months,
                metric TEXT,
                thesis TEXT,
                product TEXT,
                sub_product TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .unwrap();

        Storage::init_schema(&conn).unwrap();
        Storage::init_schema(&conn).unwrap();

        let columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('roadmap_items') WHERE name = 'objective_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(columns, 1);
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let env = TestEnv::new();
        let result = Storage::open_with_data_dir(env.path(), env.data_path());
        assert!(matches!(result, Err(Error::NotInitialized)));
    }

    #[test]
    fn test_init_is_idempotent() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        storage.create_item(&item("rm-0001", "Keep me")).unwrap();
        drop(storage);

        let storage = env.init_storage();
        assert_eq!(storage.list_items().unwrap().len(), 1);
    }

    #[test]
    fn test_create_get_update_delete_item() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();

        let mut it = item("rm-0001", "Checkout");
        it.start_date = NaiveDate::from_ymd_opt(2024, 7, 15);
        it.duration_months = Some(2);
        it.product = Some("web".to_string());
        storage.create_item(&it).unwrap();

        let loaded = storage.get_item("rm-0001").unwrap();
        assert_eq!(loaded.name, "Checkout");
        assert_eq!(loaded.start_date, it.start_date);
        assert_eq!(loaded.duration_months, Some(2));

        it.status = ItemStatus::Done;
        it.name = "Checkout v2".to_string();
        storage.update_item(&it).unwrap();
        let loaded = storage.get_item("rm-0001").unwrap();
        assert_eq!(loaded.status, ItemStatus::Done);
        assert_eq!(loaded.name, "Checkout v2");

        storage.delete_item("rm-0001").unwrap();
        assert!(matches!(storage.get_item("rm-0001"), Err(Error::NotFound(_))));
        assert!(matches!(storage.delete_item("rm-0001"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_missing_item_is_not_found() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let result = storage.update_item(&item("rm-dead", "Ghost"));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_legacy_rows_are_normalized() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        let now = Utc::now().to_rfc3339();
        storage
            .conn
            .execute(
                "INSERT INTO roadmap_items (id, name, status, start_date, duration_months, product, sub_product, created_at, updated_at)
                 VALUES ('rm-0abc', 'Legacy', 'Current Sprint', '2024-03-20T12:00:00Z', '2.5', ' WEB ', '', ?1, ?1)",
                [&now],
            )
            .unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO roadmap_items (id, name, status, start_date, duration_months, created_at, updated_at)
                 VALUES ('rm-0abd', 'Garbage', 'archived', 'soon', 'lots', ?1, ?1)",
                [&now],
            )
            .unwrap();

        let legacy = storage.get_item("rm-0abc").unwrap();
        assert_eq!(legacy.status, ItemStatus::CurrentSprint);
        assert_eq!(legacy.start_date, NaiveDate::from_ymd_opt(2024, 3, 20));
        assert_eq!(legacy.duration_months, Some(2));
        assert_eq!(legacy.product.as_deref(), Some("web"));
        assert_eq!(legacy.sub_product, None);

        let garbage = storage.get_item("rm-0abd").unwrap();
        assert_eq!(garbage.status, ItemStatus::Other("archived".to_string()));
        assert_eq!(garbage.start_date, None);
        assert_eq!(garbage.duration_months, Some(1));
    }

    #[test]
    fn test_bulk_delete_uses_snapshot() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        for id in ["rm-0001", "rm-0002", "rm-0003"] {
            storage.create_item(&item(id, id)).unwrap();
        }

        let mut selection = Selection::new();
        selection.toggle("rm-0001");
        selection.toggle("rm-0002");
        selection.toggle("rm-ffff");
        let batch = selection.snapshot();
        selection.toggle("rm-0003");

        let removed = storage.delete_items(&batch).unwrap();
        assert_eq!(removed, 2);

        let remaining: Vec<String> = storage.list_items().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(remaining, vec!["rm-0003"]);
    }

    #[test]
    fn test_item_with_unknown_objective_is_rejected() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let mut it = item("rm-0001", "Linked");
        it.objective_id = Some("okr-0000".to_string());
        assert!(matches!(storage.create_item(&it), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_objective_cascades() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();

        let objective = Objective::new("okr-0001".to_string(), "Grow".to_string(), 3, 2024);
        storage.create_objective(&objective).unwrap();
        storage
            .add_key_result(&KeyResult::new(
                "kr-0001".to_string(),
                "okr-0001".to_string(),
                "Signups".to_string(),
                100.0,
            ))
            .unwrap();

        let mut it = item("rm-0001", "Linked");
        it.objective_id = Some("okr-0001".to_string());
        storage.create_item(&it).unwrap();

        storage.delete_objective("okr-0001").unwrap();

        assert!(storage.get_key_result("kr-0001").is_err());
        assert_eq!(storage.get_item("rm-0001").unwrap().objective_id, None);
        assert!(matches!(
            storage.delete_objective("okr-0001"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_list_objectives_by_period() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        storage
            .create_objective(&Objective::new("okr-0001".to_string(), "A".to_string(), 1, 2024))
            .unwrap();
        storage
            .create_objective(&Objective::new("okr-0002".to_string(), "B".to_string(), 2, 2024))
            .unwrap();
        storage
            .create_objective(&Objective::new("okr-0003".to_string(), "C".to_string(), 1, 2025))
            .unwrap();

        assert_eq!(storage.list_objectives(None, None).unwrap().len(), 3);
        assert_eq!(storage.list_objectives(Some(1), None).unwrap().len(), 2);
        let q1_2024 = storage.list_objectives(Some(1), Some(2024)).unwrap();
        assert_eq!(q1_2024.len(), 1);
        assert_eq!(q1_2024[0].id, "okr-0001");
    }

    #[test]
    fn test_key_result_update() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        storage
            .create_objective(&Objective::new("okr-0001".to_string(), "A".to_string(), 1, 2024))
            .unwrap();
        let mut kr = KeyResult::new(
            "kr-0001".to_string(),
            "okr-0001".to_string(),
            "NPS".to_string(),
            50.0,
        );
        storage.add_key_result(&kr).unwrap();

        kr.current_value = 25.0;
        storage.update_key_result(&kr).unwrap();
        let loaded = storage.list_key_results("okr-0001").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].progress_percent(), 50);
    }

    #[test]
    fn test_votes_are_unique_per_user_and_order_requests() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let ana = User::new("usr-0001".to_string(), "ana@example.com".to_string(), Role::Viewer);
        let bia = User::new("usr-0002".to_string(), "bia@example.com".to_string(), Role::Viewer);
        storage.add_user(&ana).unwrap();
        storage.add_user(&bia).unwrap();

        storage
            .create_request(&FeatureRequest::new("req-0001".to_string(), "Dark mode".to_string()))
            .unwrap();
        storage
            .create_request(&FeatureRequest::new("req-0002".to_string(), "Export CSV".to_string()))
            .unwrap();

        assert!(storage.vote("req-0002", &ana.id).unwrap());
        assert!(!storage.vote("req-0002", &ana.id).unwrap());
        assert!(storage.vote("req-0002", &bia.id).unwrap());
        assert!(storage.vote("req-0001", &bia.id).unwrap());

        let listed = storage.list_requests(None, None).unwrap();
        assert_eq!(listed[0].id, "req-0002");
        assert_eq!(listed[0].votes, 2);
        assert_eq!(listed[1].votes, 1);

        assert!(storage.unvote("req-0002", &ana.id).unwrap());
        assert!(!storage.unvote("req-0002", &ana.id).unwrap());
        assert_eq!(storage.get_request("req-0002").unwrap().votes, 1);
    }

    #[test]
    fn test_list_requests_filters() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let mut web = FeatureRequest::new("req-0001".to_string(), "Web thing".to_string());
        web.product = Some("web".to_string());
        storage.create_request(&web).unwrap();
        storage
            .create_request(&FeatureRequest::new("req-0002".to_string(), "Other".to_string()))
            .unwrap();
        storage
            .set_request_status("req-0002", RequestStatus::Planned)
            .unwrap();

        assert_eq!(storage.list_requests(Some("WEB"), None).unwrap().len(), 1);
        let planned = storage
            .list_requests(None, Some(RequestStatus::Planned))
            .unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].id, "req-0002");
    }

    #[test]
    fn test_users_unique_email_and_role_change() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let user = User::new("usr-0001".to_string(), "ana@example.com".to_string(), Role::Viewer);
        storage.add_user(&user).unwrap();

        let dup = User::new("usr-0002".to_string(), "ANA@example.com".to_string(), Role::Admin);
        assert!(matches!(storage.add_user(&dup), Err(Error::AlreadyExists(_))));

        let updated = storage.set_user_role("Ana@Example.com", Role::Editor).unwrap();
        assert_eq!(updated.role, Role::Editor);
        assert_eq!(
            storage.get_user_by_email("ana@example.com").unwrap().role,
            Role::Editor
        );
        assert_eq!(storage.count_users().unwrap(), 1);
    }

    #[test]
    fn test_sprints_round_trip_in_order() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let later = Sprint {
            id: "spr-0002".to_string(),
            name: "Sprint 2".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
            planned_points: 20,
            delivered_points: 18,
        };
        let earlier = Sprint {
            id: "spr-0001".to_string(),
            name: "Sprint 1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
            planned_points: 20,
            delivered_points: 10,
        };
        storage.add_sprint(&later).unwrap();
        storage.add_sprint(&earlier).unwrap();

        let sprints = storage.list_sprints().unwrap();
        assert_eq!(sprints, vec![earlier, later]);

        storage.delete_sprint("spr-0001").unwrap();
        assert_eq!(storage.list_sprints().unwrap().len(), 1);
    }

    #[test]
    fn test_generate_id_format() {
        let id = generate_id(ITEM_PREFIX, "test seed");
        assert!(id.starts_with("rm-"));
        assert_eq!(id.len(), 7);
        assert!(validate_id(&id, ITEM_PREFIX).is_ok());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("rm-a1b2", "rm").is_ok());
        assert!(validate_id("okr-ffff", "okr").is_ok());
        assert!(validate_id("task-a1b2", "rm").is_err());
        assert!(validate_id("rm-a1b", "rm").is_err());
        assert!(validate_id("rm-ghij", "rm").is_err());
        assert!(validate_id("rma1b2", "rm").is_err());
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_item_status("current-sprint").unwrap(), ItemStatus::CurrentSprint);
        assert!(parse_item_status("paused").is_err());
        assert_eq!(parse_request_status("In Progress").unwrap(), RequestStatus::InProgress);
        assert_eq!(parse_role("ADMIN").unwrap(), Role::Admin);
        assert!(parse_role("owner").is_err());
        assert!(parse_date("2024-02-30").is_err());
        assert_eq!(parse_date("2024-02-29").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }
}
