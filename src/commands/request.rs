//! `rot request` commands: feature requests and voting.

use serde::Serialize;

use super::{Context, Output, exists, non_empty, to_json_string, unique_id};
use crate::models::{FeatureRequest, Role, normalize_tag};
use crate::storage::{REQUEST_PREFIX, parse_request_status, validate_id};
use crate::{Error, Result};

impl Output for FeatureRequest {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "{} [{}] {} ({} vote(s))",
            self.id, self.status, self.title, self.votes
        );
        if let Some(product) = &self.product {
            out.push_str(&format!("\n  Product: {}", product));
        }
        if let Some(description) = &self.description {
            out.push_str(&format!("\n  {}", description));
        }
        out
    }
}

/// Submit a feature request as the acting user.
pub fn request_create(
    ctx: &Context,
    title: &str,
    description: Option<String>,
    product: Option<String>,
) -> Result<FeatureRequest> {
    let mut storage = ctx.open_storage()?;
    let actor = ctx.actor(&storage)?;
    let author = if actor.open_workspace {
        actor.user_id().map(str::to_string)
    } else {
        Some(actor.known_user()?.id.clone())
    };

    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Request title is required".to_string()));
    }

    let id = unique_id(REQUEST_PREFIX, title, |id| exists(storage.get_request(id)))?;
    let mut request = FeatureRequest::new(id, title.to_string());
    request.description = non_empty(description);
    request.product = normalize_tag(product.as_deref());
    request.author = author;
    storage.create_request(&request)?;
    Ok(request)
}

#[derive(Serialize)]
pub struct RequestList {
    pub requests: Vec<FeatureRequest>,
    pub count: usize,
}

impl Output for RequestList {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.requests.is_empty() {
            return "No requests.".to_string();
        }
        let mut lines = vec![format!("{} request(s), most voted first:", self.count)];
        for r in &self.requests {
            lines.push(format!("  {} {:>3} votes  [{}] {}", r.id, r.votes, r.status, r.title));
        }
        lines.join("\n")
    }
}

pub fn request_list(ctx: &Context, product: Option<&str>, status: Option<&str>) -> Result<RequestList> {
    let storage = ctx.open_storage()?;
    let status = status.map(parse_request_status).transpose()?;
    let requests = storage.list_requests(product, status)?;
    Ok(RequestList {
        count: requests.len(),
        requests,
    })
}

#[derive(Serialize)]
pub struct VoteResult {
    pub request_id: String,
    /// Whether the user now has a vote on the request
    pub voted: bool,
    /// False when the call had no effect
    pub changed: bool,
    pub votes: u32,
}

impl Output for VoteResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let action = match (self.voted, self.changed) {
            (true, true) => "Voted for",
            (true, false) => "Already voted for",
            (false, true) => "Removed vote from",
            (false, false) => "No vote to remove on",
        };
        format!("{} {} ({} vote(s))", action, self.request_id, self.votes)
    }
}

/// Vote for a request. Each registered user has at most one vote per request.
pub fn request_vote(ctx: &Context, id: &str) -> Result<VoteResult> {
    set_vote(ctx, id, true)
}

pub fn request_unvote(ctx: &Context, id: &str) -> Result<VoteResult> {
    set_vote(ctx, id, false)
}

fn set_vote(ctx: &Context, id: &str, vote: bool) -> Result<VoteResult> {
    validate_id(id, REQUEST_PREFIX)?;
    let mut storage = ctx.open_storage()?;
    let actor = ctx.actor(&storage)?;
    let user_id = actor.known_user()?.id.clone();

    let changed = if vote {
        storage.vote(id, &user_id)?
    } else {
        storage.unvote(id, &user_id)?
    };
    let request = storage.get_request(id)?;
    Ok(VoteResult {
        request_id: request.id,
        voted: vote,
        changed,
        votes: request.votes,
    })
}

/// Move a request through its lifecycle. Requires editor.
pub fn request_status(ctx: &Context, id: &str, status: &str) -> Result<FeatureRequest> {
    validate_id(id, REQUEST_PREFIX)?;
    let status = parse_request_status(status)?;
    let mut storage = ctx.open_storage()?;
    ctx.require_role(&storage, Role::Editor)?;
    storage.set_request_status(id, status)?;
    storage.get_request(id)
}
