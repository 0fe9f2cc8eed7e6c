//! Objectives and key results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An objective scoped to a quarter of a year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    /// Unique identifier (e.g., "okr-a1b2")
    pub id: String,

    /// Objective title
    pub title: String,

    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Quarter number (1-4)
    pub quarter: u8,

    /// Calendar year
    pub year: i32,

    /// ID of the owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Objective {
    pub fn new(id: String, title: String, quarter: u8, year: i32) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description: None,
            quarter,
            year,
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A measurable key result belonging to an objective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyResult {
    /// Unique identifier (e.g., "kr-a1b2")
    pub id: String,

    /// Parent objective ID
    pub objective_id: String,

    /// Key result title
    pub title: String,

    /// Baseline value
    #[serde(default)]
    pub start_value: f64,

    /// Value that counts as 100%
    pub target_value: f64,

    /// Latest measured value
    #[serde(default)]
    pub current_value: f64,

    /// Display unit (e.g., "%", "users")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl KeyResult {
    pub fn new(id: String, objective_id: String, title: String, target_value: f64) -> Self {
        Self {
            id,
            objective_id,
            title,
            start_value: 0.0,
            target_value,
            current_value: 0.0,
            unit: None,
        }
    }

    /// Progress from start towards target, clamped to 0..=100.
    ///
    /// Works for decreasing targets too (start above target).
    pub fn progress_percent(&self) -> u8 {
        let span = self.target_value - self.start_value;
        if span == 0.0 || !span.is_finite() {
            let reached = if self.target_value >= self.start_value {
                self.current_value >= self.target_value
            } else {
                self.current_value <= self.target_value
            };
            return if reached { 100 } else { 0 };
        }
        let ratio = (self.current_value - self.start_value) / span;
        if !ratio.is_finite() {
            return 0;
        }
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Aggregated progress of an objective over its key results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    /// Number of key results
    pub key_results: usize,
    /// Number of key results at 100%
    pub completed: usize,
    /// Mean key result progress (0-100)
    pub percentage: u8,
}

impl ObjectiveProgress {
    pub fn from_key_results(krs: &[KeyResult]) -> Self {
        if krs.is_empty() {
            return Self {
                key_results: 0,
                completed: 0,
                percentage: 0,
            };
        }
        let sum: u32 = krs.iter().map(|kr| kr.progress_percent() as u32).sum();
        let count = krs.len() as u32;
        Self {
            key_results: krs.len(),
            completed: krs.iter().filter(|kr| kr.progress_percent() == 100).count(),
            percentage: ((sum + count / 2) / count) as u8,
        }
    }
}
