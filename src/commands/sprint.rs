//! `rot sprint` commands.

use serde::Serialize;

use super::{Context, Output, to_json_string, unique_id};
use crate::models::{Role, Sprint, SprintPerformance};
use crate::storage::{SPRINT_PREFIX, parse_date, validate_id};
use crate::{Error, Result};

/// Sprint fields given on the command line.
#[derive(Debug, Clone)]
pub struct SprintFields {
    pub name: String,
    pub start: String,
    pub end: String,
    pub planned: u32,
    pub delivered: u32,
}

impl Output for Sprint {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "{} {} ({} to {}): {}/{} points, {}%",
            self.id,
            self.name,
            self.start_date,
            self.end_date,
            self.delivered_points,
            self.planned_points,
            self.completion_percent()
        )
    }
}

/// Record a sprint. Requires editor.
pub fn sprint_add(ctx: &Context, fields: SprintFields) -> Result<Sprint> {
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;

    let name = fields.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::InvalidInput("Sprint name is required".to_string()));
    }
    let start_date = parse_date(&fields.start)?;
    let end_date = parse_date(&fields.end)?;
    if end_date < start_date {
        return Err(Error::InvalidInput(format!(
            "Sprint ends ({}) before it starts ({})",
            end_date, start_date
        )));
    }

    let existing = storage.list_sprints()?;
    let id = unique_id(SPRINT_PREFIX, &name, |id| Ok(existing.iter().any(|s| s.id == id)))?;
    let sprint = Sprint {
        id,
        name,
        start_date,
        end_date,
        planned_points: fields.planned,
        delivered_points: fields.delivered,
    };
    storage.add_sprint(&sprint)?;
    Ok(sprint)
}

#[derive(Serialize)]
pub struct SprintList {
    pub sprints: Vec<Sprint>,
    pub count: usize,
}

impl Output for SprintList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.sprints.is_empty() {
            return "No sprints.".to_string();
        }
        let mut lines = vec![format!("{} sprint(s):", self.count)];
        lines.extend(self.sprints.iter().map(|s| format!("  {}", s.to_human())));
        lines.join("\n")
    }
}

pub fn sprint_list(ctx: &Context) -> Result<SprintList> {
    let storage = ctx.open_storage()?;
    let sprints = storage.list_sprints()?;
    Ok(SprintList {
        count: sprints.len(),
        sprints,
    })
}

impl Output for SprintPerformance {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.sprints.is_empty() {
            return "No sprints recorded.".to_string();
        }
        let mut lines = vec![format!(
            "Average velocity: {:.1} points, average completion: {:.1}%",
            self.average_velocity, self.average_completion
        )];
        if let Some(best) = &self.best_sprint {
            lines.push(format!("Best sprint: {}", best));
        }
        for s in &self.sprints {
            lines.push(format!(
                "  {:<20} {:>4}/{:<4} {:>3}%",
                s.name, s.delivered_points, s.planned_points, s.completion_percent
            ));
        }
        lines.join("\n")
    }
}

pub fn sprint_performance(ctx: &Context) -> Result<SprintPerformance> {
    let storage = ctx.open_storage()?;
    Ok(SprintPerformance::summarize(&storage.list_sprints()?))
}

#[derive(Serialize)]
pub struct SprintDeleted {
    pub id: String,
}

impl Output for SprintDeleted {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted sprint {}", self.id)
    }
}

pub fn sprint_delete(ctx: &Context, id: &str) -> Result<SprintDeleted> {
    validate_id(id, SPRINT_PREFIX)?;
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;
    storage.delete_sprint(id)?;
    Ok(SprintDeleted { id: id.to_string() })
}
