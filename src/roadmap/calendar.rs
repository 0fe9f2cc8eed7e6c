//! Month-granularity date math for roadmap items.
//!
//! An item's span runs from the first day of its start month to the last day
//! of month `start + months_included - 1`. Days within the start month are
//! ignored: an item starting on the 15th is active for the whole month.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use super::Quarter;
use crate::models::RoadmapItem;

/// First day of `month` in `year`. Months outside 1..=12 carry into
/// neighbouring years (month 13 is January of the next year).
///
/// Returns `None` only when the result falls outside the supported calendar.
pub fn first_day_of_month(year: i32, month: i64) -> Option<NaiveDate> {
    let index = (year as i64).checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let y = i32::try_from(index.div_euclid(12)).ok()?;
    let m = (index.rem_euclid(12) + 1) as u32;
    NaiveDate::from_ymd_opt(y, m, 1)
}

/// Last day of `month` in `year`, with the same carry rules as
/// [`first_day_of_month`].
pub fn last_day_of_month(year: i32, month: i64) -> Option<NaiveDate> {
    first_day_of_month(year, month.checked_add(1)?)?.pred_opt()
}

/// Inclusive `(first day, last day)` covered by a dated item.
///
/// Spans running past the end of the supported calendar are capped at
/// `NaiveDate::MAX`.
pub fn item_span(item: &RoadmapItem) -> Option<(NaiveDate, NaiveDate)> {
    let start = item.start_date?;
    let months = item.months_included()?;

    let first = first_day_of_month(start.year(), start.month() as i64)?;
    let end_month = (start.month() as i64).saturating_add(months - 1);
    let last = last_day_of_month(start.year(), end_month).unwrap_or(NaiveDate::MAX);

    Some((first, last))
}

/// Whether the item's span overlaps `month` of `year`.
///
/// Undated items are never active.
pub fn is_active_in_month(item: &RoadmapItem, month: u32, year: i32) -> bool {
    let Some((start, end)) = item_span(item) else {
        return false;
    };
    let (Some(check_start), Some(check_end)) = (
        first_day_of_month(year, month as i64),
        last_day_of_month(year, month as i64),
    ) else {
        return false;
    };

    start <= check_end && end >= check_start
}

/// Whether the item belongs on the roadmap for `quarter` of `year`.
///
/// Undated items are shown in every quarter so newly created or legacy rows
/// are never hidden.
pub fn is_visible_in_quarter(item: &RoadmapItem, quarter: Quarter, year: i32) -> bool {
    if item.is_undated() {
        return true;
    }
    quarter
        .months()
        .iter()
        .any(|&m| is_active_in_month(item, m, year))
}

/// Active-month marks for the three months of `quarter`.
pub fn active_months(item: &RoadmapItem, quarter: Quarter, year: i32) -> [bool; 3] {
    quarter.months().map(|m| is_active_in_month(item, m, year))
}

/// Share of the item's span elapsed at `now`, as a whole percentage.
///
/// The span is measured from midnight of its first day to midnight of its
/// last day. Undated items report 0.
pub fn progress_percent(item: &RoadmapItem, now: NaiveDateTime) -> u8 {
    let Some((start, end)) = item_span(item) else {
        return 0;
    };
    span_progress(
        start.and_time(NaiveTime::MIN),
        end.and_time(NaiveTime::MIN),
        now,
    )
}

/// Share of `start..end` elapsed at `now`, clamped to 0..=100.
fn span_progress(start: NaiveDateTime, end: NaiveDateTime, now: NaiveDateTime) -> u8 {
    let elapsed = now.signed_duration_since(start).num_milliseconds();
    if elapsed <= 0 {
        return 0;
    }
    let total = end.signed_duration_since(start).num_milliseconds();
    if elapsed >= total || total <= 0 {
        return 100;
    }

    // Round half up in integer space
    let (elapsed, total) = (elapsed as i128, total as i128);
    ((elapsed * 200 + total) / (total * 2)) as u8
}
