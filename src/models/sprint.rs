//! Sprint delivery records and the performance summary built from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A completed or running sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    /// Unique identifier (e.g., "spr-a1b2")
    pub id: String,

    /// Sprint name (e.g., "Sprint 42")
    pub name: String,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    /// Story points committed at planning
    pub planned_points: u32,

    /// Story points actually delivered
    pub delivered_points: u32,
}

impl Sprint {
    /// Delivered over planned, as a whole percentage. Zero when nothing was planned.
    ///
    /// Over-delivery is reported as-is (may exceed 100).
    pub fn completion_percent(&self) -> u64 {
        if self.planned_points == 0 {
            return 0;
        }
        let planned = self.planned_points as u64;
        (u64::from(self.delivered_points) * 200 + planned) / (planned * 2)
    }
}

/// Per-sprint line of a performance summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintSummary {
    pub id: String,
    pub name: String,
    pub planned_points: u32,
    pub delivered_points: u32,
    pub completion_percent: u64,
}

/// Performance dashboard data over a set of sprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintPerformance {
    /// Sprints in chronological order
    pub sprints: Vec<SprintSummary>,
    /// Mean delivered points per sprint
    pub average_velocity: f64,
    /// Mean completion percentage
    pub average_completion: f64,
    /// Name of the sprint with the highest completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_sprint: Option<String>,
}

impl SprintPerformance {
    pub fn summarize(sprints: &[Sprint]) -> Self {
        let mut ordered: Vec<&Sprint> = sprints.iter().collect();
        ordered.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));

        let summaries: Vec<SprintSummary> = ordered
            .iter()
            .map(|s| SprintSummary {
                id: s.id.clone(),
                name: s.name.clone(),
                planned_points: s.planned_points,
                delivered_points: s.delivered_points,
                completion_percent: s.completion_percent(),
            })
            .collect();

        let (average_velocity, average_completion) = if summaries.is_empty() {
            (0.0, 0.0)
        } else {
            let n = summaries.len() as f64;
            let velocity: u64 = summaries.iter().map(|s| s.delivered_points as u64).sum();
            let completion: u64 = summaries.iter().map(|s| s.completion_percent).sum();
            (velocity as f64 / n, completion as f64 / n)
        };

        // First sprint wins ties
        let best_sprint = summaries
            .iter()
            .fold(None::<&SprintSummary>, |best, s| match best {
                Some(b) if b.completion_percent >= s.completion_percent => Some(b),
                _ => Some(s),
            })
            .map(|s| s.name.clone());

        Self {
            sprints: summaries,
            average_velocity,
            average_completion,
            best_sprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprint(id: &str, month: u32, planned: u32, delivered: u32) -> Sprint {
        Sprint {
            id: id.to_string(),
            name: format!("Sprint {}", id),
            start_date: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, month, 14).unwrap(),
            planned_points: planned,
            delivered_points: delivered,
        }
    }

    #[test]
    fn test_completion_percent() {
        assert_eq!(sprint("a", 1, 20, 15).completion_percent(), 75);
        assert_eq!(sprint("a", 1, 3, 2).completion_percent(), 67);
        assert_eq!(sprint("a", 1, 0, 5).completion_percent(), 0);
        assert_eq!(sprint("a", 1, 10, 12).completion_percent(), 120);
    }

    #[test]
    fn test_completion_percent_large_delivery() {
        let huge = sprint("a", 1, 1, 50_000_000);
        assert_eq!(huge.completion_percent(), 5_000_000_000);
        let max = sprint("b", 1, 1, u32::MAX);
        assert_eq!(max.completion_percent(), u64::from(u32::MAX) * 100);
    }

    #[test]
    fn test_summarize_orders_and_averages() {
        let sprints = vec![sprint("b", 2, 10, 10), sprint("a", 1, 20, 10)];
        let perf = SprintPerformance::summarize(&sprints);

        assert_eq!(perf.sprints[0].id, "a");
        assert_eq!(perf.sprints[1].id, "b");
        assert_eq!(perf.average_velocity, 10.0);
        assert_eq!(perf.average_completion, 75.0);
        assert_eq!(perf.best_sprint.as_deref(), Some("Sprint b"));
    }

    #[test]
    fn test_summarize_empty() {
        let perf = SprintPerformance::summarize(&[]);
        assert!(perf.sprints.is_empty());
        assert_eq!(perf.average_velocity, 0.0);
        assert!(perf.best_sprint.is_none());
    }
}
