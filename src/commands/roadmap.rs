//! `rot roadmap`: the quarter view.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::{Context, Output, to_json_string};
use crate::Result;
use crate::models::{ItemStatus, RoadmapItem, normalize_tag};
use crate::roadmap::{Quarter, RoadmapFilter, active_months, progress_percent, visible_sorted_items};

const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Quarter, year and filters selecting the visible set.
#[derive(Debug, Clone, Default)]
pub struct RoadmapQuery {
    pub quarter: Option<Quarter>,
    pub year: Option<i32>,
    pub search: Option<String>,
    pub product: Option<String>,
    pub sub_product: Option<String>,
}

impl RoadmapQuery {
    /// Quarter and year to show; missing parts come from `today`.
    pub fn period(&self, today: NaiveDate) -> (Quarter, i32) {
        (
            self.quarter.unwrap_or_else(|| Quarter::containing(today.month())),
            self.year.unwrap_or_else(|| today.year()),
        )
    }

    pub fn filter(&self) -> RoadmapFilter {
        RoadmapFilter::new(
            super::non_empty(self.search.clone()),
            normalize_tag(self.product.as_deref()),
            normalize_tag(self.sub_product.as_deref()),
        )
    }

    /// Ids of the items the query shows, in display order.
    pub fn visible_ids(&self, items: &[RoadmapItem], today: NaiveDate) -> Vec<String> {
        let (quarter, year) = self.period(today);
        visible_sorted_items(items, quarter, year, &self.filter())
            .into_iter()
            .map(|item| item.id.clone())
            .collect()
    }
}

/// The instant progress is measured at: midnight of `at`, or the local clock.
pub fn view_instant(at: Option<NaiveDate>) -> NaiveDateTime {
    match at {
        Some(date) => date.and_time(NaiveTime::MIN),
        None => Local::now().naive_local(),
    }
}

#[derive(Serialize)]
pub struct RoadmapRow {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_months: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_product: Option<String>,
    /// Activity in each of the quarter's three months
    pub active_months: [bool; 3],
    pub progress: u8,
}

#[derive(Serialize)]
pub struct RoadmapView {
    pub quarter: Quarter,
    pub year: i32,
    /// The quarter's months as `YYYY-MM`
    pub months: Vec<String>,
    pub at: NaiveDateTime,
    pub filter: RoadmapFilter,
    pub items: Vec<RoadmapRow>,
    pub count: usize,
}

impl Output for RoadmapView {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let month_names: Vec<&str> = self
            .quarter
            .months()
            .iter()
            .map(|m| MONTH_ABBR[(*m - 1) as usize])
            .collect();
        let mut lines = vec![format!(
            "{} {} ({})  {} item(s)",
            self.quarter,
            self.year,
            month_names.join(" "),
            self.count
        )];
        if self.items.is_empty() {
            lines.push("  Nothing on the roadmap for this quarter.".to_string());
            return lines.join("\n");
        }
        for row in &self.items {
            let marks: Vec<&str> = row
                .active_months
                .iter()
                .map(|active| if *active { "#" } else { "." })
                .collect();
            let tags = match (&row.product, &row.sub_product) {
                (Some(p), Some(s)) => format!("  ({}/{})", p, s),
                (Some(p), None) => format!("  ({})", p),
                (None, Some(s)) => format!("  (-/{})", s),
                (None, None) => String::new(),
            };
            lines.push(format!(
                "  {} [{}] {:>3}%  {:<14} {}{}",
                row.id,
                marks.join(" "),
                row.progress,
                row.status.as_str(),
                row.name,
                tags
            ));
        }
        lines.join("\n")
    }
}

/// Build the quarter view: visible items in display order with their
/// month marks and progress at `at`.
pub fn roadmap_view(ctx: &Context, query: &RoadmapQuery, at: Option<NaiveDate>) -> Result<RoadmapView> {
    let storage = ctx.open_storage()?;
    let items = storage.list_items()?;
    let now = view_instant(at);
    let (quarter, year) = query.period(now.date());
    let filter = query.filter();

    let rows: Vec<RoadmapRow> = visible_sorted_items(&items, quarter, year, &filter)
        .into_iter()
        .map(|item| RoadmapRow {
            id: item.id.clone(),
            name: item.name.clone(),
            status: item.status.clone(),
            start_date: item.start_date,
            duration_months: item.duration_months,
            product: item.product.clone(),
            sub_product: item.sub_product.clone(),
            active_months: active_months(item, quarter, year),
            progress: progress_percent(item, now),
        })
        .collect();

    Ok(RoadmapView {
        quarter,
        year,
        months: quarter
            .months()
            .iter()
            .map(|m| format!("{:04}-{:02}", year, m))
            .collect(),
        at: now,
        filter,
        count: rows.len(),
        items: rows,
    })
}
