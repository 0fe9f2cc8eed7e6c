//! Roadmap temporal placement and ordering.
//!
//! Everything in this module is a pure function of its inputs. The current
//! year and the current instant are always supplied by the caller, never read
//! from the clock, so results are reproducible.
//!
//! - [`calendar`] - month activity, quarter visibility and duration progress
//! - [`pipeline`] - text/product/quarter filtering followed by the display sort
//! - [`selection`] - bulk selection state derived from the visible set

pub mod calendar;
pub mod pipeline;
pub mod selection;

pub use calendar::{
    active_months, first_day_of_month, is_active_in_month, is_visible_in_quarter, item_span,
    last_day_of_month, progress_percent,
};
pub use pipeline::{RoadmapFilter, compare_items, visible_sorted_items};
pub use selection::{BulkDelete, Selection, SelectionState};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the four fixed three-month groups of a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// Quarter from its number (1-4).
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// Quarter that contains `month` (1-12). Out-of-range months clamp.
    pub fn containing(month: u32) -> Self {
        match month {
            0..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// The three month numbers of this quarter, in order.
    pub fn months(&self) -> [u32; 3] {
        let first = (self.number() as u32 - 1) * 3 + 1;
        [first, first + 1, first + 2]
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl FromStr for Quarter {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('Q')
            .or_else(|| trimmed.strip_prefix('q'))
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Quarter::from_number)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Invalid quarter: {}", s)))
    }
}
