//! `rot okr` commands: objectives and their key results.

use chrono::Utc;
use serde::Serialize;

use super::{Context, Output, exists, non_empty, to_json_string, unique_id};
use crate::models::{KeyResult, Objective, ObjectiveProgress, Role};
use crate::roadmap::Quarter;
use crate::storage::{KEY_RESULT_PREFIX, OBJECTIVE_PREFIX, validate_id};
use crate::{Error, Result};

#[derive(Serialize)]
pub struct ObjectiveCreated {
    pub id: String,
    pub title: String,
    pub quarter: Quarter,
    pub year: i32,
}

impl Output for ObjectiveCreated {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Created objective {} \"{}\" for {} {}",
            self.id, self.title, self.quarter, self.year
        )
    }
}

/// Create an objective. The owner defaults to the acting user. Requires editor.
pub fn okr_create(
    ctx: &Context,
    title: &str,
    quarter: Quarter,
    year: i32,
    description: Option<String>,
    owner: Option<String>,
) -> Result<ObjectiveCreated> {
    let mut storage = ctx.open_storage()?;
    let actor = ctx.require_role(&storage, Role::Editor)?;

    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Objective title is required".to_string()));
    }
    if !(1..=9999).contains(&year) {
        return Err(Error::InvalidInput(format!("Invalid year: {}", year)));
    }

    let id = unique_id(OBJECTIVE_PREFIX, title, |id| exists(storage.get_objective(id)))?;
    let mut objective = Objective::new(id, title.to_string(), quarter.number(), year);
    objective.description = non_empty(description);
    objective.owner = non_empty(owner).or(actor.email);
    storage.create_objective(&objective)?;

    Ok(ObjectiveCreated {
        id: objective.id,
        title: objective.title,
        quarter,
        year,
    })
}

#[derive(Serialize)]
pub struct ObjectiveSummary {
    #[serde(flatten)]
    pub objective: Objective,
    pub progress: ObjectiveProgress,
}

#[derive(Serialize)]
pub struct ObjectiveList {
    pub objectives: Vec<ObjectiveSummary>,
    pub count: usize,
}

impl Output for ObjectiveList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.objectives.is_empty() {
            return "No objectives.".to_string();
        }
        let mut lines = vec![format!("{} objective(s):", self.count)];
        for summary in &self.objectives {
            let o = &summary.objective;
            lines.push(format!(
                "  {} Q{} {} {:>3}% ({}/{} KRs) {}",
                o.id,
                o.quarter,
                o.year,
                summary.progress.percentage,
                summary.progress.completed,
                summary.progress.key_results,
                o.title
            ));
        }
        lines.join("\n")
    }
}

pub fn okr_list(ctx: &Context, quarter: Option<Quarter>, year: Option<i32>) -> Result<ObjectiveList> {
    let storage = ctx.open_storage()?;
    let objectives = storage
        .list_objectives(quarter.map(|q| q.number()), year)?
        .into_iter()
        .map(|objective| {
            let krs = storage.list_key_results(&objective.id)?;
            Ok(ObjectiveSummary {
                progress: ObjectiveProgress::from_key_results(&krs),
                objective,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ObjectiveList {
        count: objectives.len(),
        objectives,
    })
}

#[derive(Serialize)]
pub struct KeyResultRow {
    #[serde(flatten)]
    pub key_result: KeyResult,
    pub progress: u8,
}

impl From<KeyResult> for KeyResultRow {
    fn from(key_result: KeyResult) -> Self {
        Self {
            progress: key_result.progress_percent(),
            key_result,
        }
    }
}

#[derive(Serialize)]
pub struct LinkedItem {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct ObjectiveDetail {
    #[serde(flatten)]
    pub objective: Objective,
    pub progress: ObjectiveProgress,
    pub key_results: Vec<KeyResultRow>,
    /// Roadmap items linked to the objective
    pub items: Vec<LinkedItem>,
}

impl Output for ObjectiveDetail {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let o = &self.objective;
        let mut lines = vec![format!(
            "{} {} (Q{} {}) {}%",
            o.id, o.title, o.quarter, o.year, self.progress.percentage
        )];
        if let Some(owner) = &o.owner {
            lines.push(format!("  Owner: {}", owner));
        }
        if let Some(description) = &o.description {
            lines.push(format!("  {}", description));
        }
        for row in &self.key_results {
            let kr = &row.key_result;
            let unit = kr.unit.as_deref().unwrap_or("");
            lines.push(format!(
                "  {} {:>3}%  {} ({}{} -> {}{}, now {}{})",
                kr.id,
                row.progress,
                kr.title,
                kr.start_value,
                unit,
                kr.target_value,
                unit,
                kr.current_value,
                unit
            ));
        }
        for item in &self.items {
            lines.push(format!("  item {} [{}] {}", item.id, item.status, item.name));
        }
        lines.join("\n")
    }
}

pub fn okr_show(ctx: &Context, id: &str) -> Result<ObjectiveDetail> {
    validate_id(id, OBJECTIVE_PREFIX)?;
    let storage = ctx.open_storage()?;
    let objective = storage.get_objective(id)?;
    let krs = storage.list_key_results(id)?;
    let items = storage
        .list_items()?
        .into_iter()
        .filter(|item| item.objective_id.as_deref() == Some(id))
        .map(|item| LinkedItem {
            id: item.id,
            name: item.name,
            status: item.status.as_str().to_string(),
        })
        .collect();

    Ok(ObjectiveDetail {
        progress: ObjectiveProgress::from_key_results(&krs),
        key_results: krs.into_iter().map(KeyResultRow::from).collect(),
        items,
        objective,
    })
}

#[derive(Serialize)]
pub struct ObjectiveDeleted {
    pub id: String,
}

impl Output for ObjectiveDeleted {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted objective {}", self.id)
    }
}

/// Delete an objective with its key results; linked items are unlinked.
pub fn okr_delete(ctx: &Context, id: &str) -> Result<ObjectiveDeleted> {
    validate_id(id, OBJECTIVE_PREFIX)?;
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;
    storage.delete_objective(id)?;
    Ok(ObjectiveDeleted { id: id.to_string() })
}

impl Output for KeyResultRow {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{} \"{}\" at {}% ({} of {})",
            self.key_result.id,
            self.key_result.title,
            self.progress,
            self.key_result.current_value,
            self.key_result.target_value
        )
    }
}

/// Add a key result to an objective. Requires editor.
pub fn okr_kr_add(
    ctx: &Context,
    objective_id: &str,
    title: &str,
    target: f64,
    start: Option<f64>,
    unit: Option<String>,
) -> Result<KeyResultRow> {
    validate_id(objective_id, OBJECTIVE_PREFIX)?;
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;

    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Key result title is required".to_string()));
    }
    if !target.is_finite() || !start.unwrap_or(0.0).is_finite() {
        return Err(Error::InvalidInput("Key result values must be finite".to_string()));
    }

    let id = unique_id(KEY_RESULT_PREFIX, title, |id| exists(storage.get_key_result(id)))?;
    let mut kr = KeyResult::new(id, objective_id.to_string(), title.to_string(), target);
    if let Some(start) = start {
        kr.start_value = start;
        kr.current_value = start;
    }
    kr.unit = non_empty(unit);
    storage.add_key_result(&kr)?;
    touch_objective(&mut storage, objective_id)?;
    Ok(KeyResultRow::from(kr))
}

/// Record the current value of a key result. Requires editor.
pub fn okr_kr_update(ctx: &Context, id: &str, current: f64) -> Result<KeyResultRow> {
    validate_id(id, KEY_RESULT_PREFIX)?;
    if !current.is_finite() {
        return Err(Error::InvalidInput("Current value must be finite".to_string()));
    }
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;

    let mut kr = storage.get_key_result(id)?;
    kr.current_value = current;
    storage.update_key_result(&kr)?;
    touch_objective(&mut storage, &kr.objective_id)?;
    Ok(KeyResultRow::from(kr))
}

fn touch_objective(storage: &mut crate::storage::Storage, id: &str) -> Result<()> {
    let mut objective = storage.get_objective(id)?;
    objective.updated_at = Utc::now();
    storage.update_objective(&objective)
}
