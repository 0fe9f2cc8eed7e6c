//! Data models for Roteiro entities.
//!
//! This module defines the core data structures:
//! - `RoadmapItem` - A roadmap entry with status, start month and duration
//! - `FeatureRequest` - A "solicitação" submitted by a user and voted on
//! - `User` - A known user and their `Role`
//! - `Objective` / `KeyResult` - OKRs (see [`okr`])
//! - `Sprint` - Sprint delivery records (see [`sprint`])
//!
//! Rows decoded from storage or JSON are normalized here: status strings,
//! product tags, durations and start dates all map to a defined value no
//! matter how malformed the input is.

pub mod okr;
pub mod sprint;

pub use okr::{KeyResult, Objective, ObjectiveProgress};
pub use sprint::{Sprint, SprintPerformance, SprintSummary};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Sort priority given to statuses the engine does not recognise.
pub const UNKNOWN_STATUS_PRIORITY: u16 = 999;

/// Roadmap item status.
///
/// Unrecognised values are preserved in `Other` rather than rejected, so a
/// row written by a newer client still loads and simply sorts last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemStatus {
    #[default]
    NotStarted,
    NextSprint,
    CurrentSprint,
    Finishing,
    Done,
    Other(String),
}

impl ItemStatus {
    /// Every recognised status, highest priority first.
    pub const KNOWN: [ItemStatus; 5] = [
        ItemStatus::Done,
        ItemStatus::Finishing,
        ItemStatus::CurrentSprint,
        ItemStatus::NextSprint,
        ItemStatus::NotStarted,
    ];

    /// Lenient parse: never fails, unknown values become `Other`.
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "not_started" | "notstarted" => ItemStatus::NotStarted,
            "next_sprint" | "nextsprint" => ItemStatus::NextSprint,
            "current_sprint" | "currentsprint" => ItemStatus::CurrentSprint,
            "finishing" => ItemStatus::Finishing,
            "done" => ItemStatus::Done,
            _ => ItemStatus::Other(s.trim().to_string()),
        }
    }

    /// Sort rank, lower sorts first.
    pub fn priority(&self) -> u16 {
        match self {
            ItemStatus::Done => 1,
            ItemStatus::Finishing => 2,
            ItemStatus::CurrentSprint => 3,
            ItemStatus::NextSprint => 4,
            ItemStatus::NotStarted => 5,
            ItemStatus::Other(_) => UNKNOWN_STATUS_PRIORITY,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ItemStatus::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ItemStatus::NotStarted => "not_started",
            ItemStatus::NextSprint => "next_sprint",
            ItemStatus::CurrentSprint => "current_sprint",
            ItemStatus::Finishing => "finishing",
            ItemStatus::Done => "done",
            ItemStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for ItemStatus {
    fn from(s: String) -> Self {
        ItemStatus::parse(&s)
    }
}

impl From<ItemStatus> for String {
    fn from(status: ItemStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A roadmap entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapItem {
    /// Unique identifier (e.g., "rm-a1b2")
    pub id: String,

    /// Display name
    pub name: String,

    /// Current status
    #[serde(default)]
    pub status: ItemStatus,

    /// Start date; only its year and month are significant
    #[serde(default, deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,

    /// Number of months the item spans, inclusive of the start month
    #[serde(default, deserialize_with = "lenient_months")]
    pub duration_months: Option<i64>,

    /// Success metric text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,

    /// Thesis / rationale text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis: Option<String>,

    /// Product tag (e.g., "web", "app")
    #[serde(default, deserialize_with = "lenient_tag", skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Sub-product tag (e.g., "backoffice")
    #[serde(default, deserialize_with = "lenient_tag", skip_serializing_if = "Option::is_none")]
    pub sub_product: Option<String>,

    /// Linked objective ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_id: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl RoadmapItem {
    /// Create a new, undated item with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            status: ItemStatus::default(),
            start_date: None,
            duration_months: None,
            metric: None,
            thesis: None,
            product: None,
            sub_product: None,
            objective_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whole months the item covers, or `None` if it has no schedule.
    ///
    /// Non-positive durations count as one month.
    pub fn months_included(&self) -> Option<i64> {
        self.start_date?;
        self.duration_months.map(|d| d.max(1))
    }

    /// True when the item lacks a start date or a duration.
    pub fn is_undated(&self) -> bool {
        self.start_date.is_none() || self.duration_months.is_none()
    }
}

/// Normalize a product or sub-product tag.
pub fn normalize_tag(tag: Option<&str>) -> Option<String> {
    tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
}

/// Normalize a raw duration value into whole months.
///
/// Integers pass through, floats and numeric strings are floored, anything
/// else present but unusable becomes `1`. Empty strings and nulls are absent.
pub fn normalize_months(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i),
            None => Some(floor_months(n.as_f64().unwrap_or(f64::NAN))),
        },
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) => Some(floor_months(f)),
            Err(_) => {
                tracing::warn!(value = %s, "non-numeric duration, treating as one month");
                Some(1)
            }
        },
        other => {
            tracing::warn!(value = %other, "unexpected duration type, treating as one month");
            Some(1)
        }
    }
}

fn floor_months(f: f64) -> i64 {
    if f.is_finite() { f.floor() as i64 } else { 1 }
}

/// Parse a start date from `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_start_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    tracing::warn!(value = %s, "unparsable start date, treating item as undated");
    None
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_start_date))
}

fn lenient_months<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_months(&raw))
}

fn lenient_tag<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_tag(raw.as_deref()))
}

/// Lifecycle of a feature request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Open,
    Planned,
    InProgress,
    Shipped,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Planned => "planned",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Shipped => "shipped",
            RequestStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A feature request ("solicitação") that users vote on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRequest {
    /// Unique identifier (e.g., "req-a1b2")
    pub id: String,

    /// Request title
    pub title: String,

    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Product tag the request targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: RequestStatus,

    /// ID of the submitting user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Number of votes (derived from the vote table on read)
    #[serde(default)]
    pub votes: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl FeatureRequest {
    /// Create a new open request with the given ID and title.
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            description: None,
            product: None,
            status: RequestStatus::default(),
            author: None,
            votes: 0,
            created_at: Utc::now(),
        }
    }
}

/// Permission level of a user. Ordered: `Viewer < Editor < Admin`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }

    /// Whether this role satisfies `required`.
    pub fn allows(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (e.g., "usr-a1b2")
    pub id: String,

    /// Login email, unique per workspace
    pub email: String,

    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Permission level
    #[serde(default)]
    pub role: Role,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: String, email: String, role: Role) -> Self {
        Self {
            id,
            email: email.trim().to_lowercase(),
            name: None,
            role,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_priority_order() {
        let priorities: Vec<u16> = ItemStatus::KNOWN.iter().map(|s| s.priority()).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            ItemStatus::Other("blocked".to_string()).priority(),
            UNKNOWN_STATUS_PRIORITY
        );
    }

    #[test]
    fn test_status_parse_is_lenient() {
        assert_eq!(ItemStatus::parse("Current Sprint"), ItemStatus::CurrentSprint);
        assert_eq!(ItemStatus::parse("next-sprint"), ItemStatus::NextSprint);
        assert_eq!(ItemStatus::parse(" DONE "), ItemStatus::Done);
        assert_eq!(
            ItemStatus::parse("archived"),
            ItemStatus::Other("archived".to_string())
        );
    }

    #[test]
    fn test_status_serde_preserves_unknown() {
        let status: ItemStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, ItemStatus::Other("paused".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"paused\"");
        assert_eq!(
            serde_json::to_string(&ItemStatus::CurrentSprint).unwrap(),
            "\"current_sprint\""
        );
    }

    #[test]
    fn test_normalize_months() {
        use serde_json::json;
        assert_eq!(normalize_months(&json!(3)), Some(3));
        assert_eq!(normalize_months(&json!(2.7)), Some(2));
        assert_eq!(normalize_months(&json!("4")), Some(4));
        assert_eq!(normalize_months(&json!("abc")), Some(1));
        assert_eq!(normalize_months(&json!(true)), Some(1));
        assert_eq!(normalize_months(&json!("")), None);
        assert_eq!(normalize_months(&json!(null)), None);
    }

    #[test]
    fn test_months_included_coerces_non_positive() {
        let mut item = RoadmapItem::new("rm-0001".to_string(), "Item".to_string());
        item.duration_months = Some(0);
        assert_eq!(item.months_included(), None);

        item.start_date = NaiveDate::from_ymd_opt(2024, 3, 10);
        assert_eq!(item.months_included(), Some(1));

        item.duration_months = Some(-4);
        assert_eq!(item.months_included(), Some(1));

        item.duration_months = Some(6);
        assert_eq!(item.months_included(), Some(6));
    }

    #[test]
    fn test_item_deserialize_normalizes_row() {
        let row = r#"{
            "id": "rm-00aa",
            "name": "Checkout",
            "status": "Current Sprint",
            "start_date": "2024-07-15T10:00:00Z",
            "duration_months": "2.9",
            "product": "  Web ",
            "sub_product": "",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let item: RoadmapItem = serde_json::from_str(row).unwrap();
        assert_eq!(item.status, ItemStatus::CurrentSprint);
        assert_eq!(item.start_date, NaiveDate::from_ymd_opt(2024, 7, 15));
        assert_eq!(item.duration_months, Some(2));
        assert_eq!(item.product.as_deref(), Some("web"));
        assert_eq!(item.sub_product, None);
    }

    #[test]
    fn test_item_deserialize_bad_date_is_undated() {
        let row = r#"{
            "id": "rm-00ab",
            "name": "Legacy",
            "start_date": "someday",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#;
        let item: RoadmapItem = serde_json::from_str(row).unwrap();
        assert!(item.is_undated());
        assert_eq!(item.status, ItemStatus::NotStarted);
    }

    #[test]
    fn test_role_ordering() {
        assert!(Role::Admin.allows(Role::Editor));
        assert!(Role::Editor.allows(Role::Editor));
        assert!(!Role::Viewer.allows(Role::Editor));
        assert!(Role::Viewer < Role::Editor && Role::Editor < Role::Admin);
    }

    #[test]
    fn test_user_email_normalized() {
        let user = User::new("usr-0001".to_string(), " Ana@Example.COM ".to_string(), Role::Editor);
        assert_eq!(user.email, "ana@example.com");
    }
}
