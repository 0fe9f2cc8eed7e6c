//! Filtering and ordering of roadmap items for display.
//!
//! Filters are pure predicates applied in a fixed order (text, product,
//! sub-product, quarter). The final stable sort is the only thing that
//! decides ordering.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Quarter, is_visible_in_quarter};
use crate::models::{RoadmapItem, normalize_tag};

/// Product tag whose "geral" sub-view shows every sub-product.
pub const GENERAL_VIEW_PRODUCT: &str = "web";

/// Sub-product value meaning "all sub-products" for [`GENERAL_VIEW_PRODUCT`].
pub const GENERAL_SUB_PRODUCT: &str = "geral";

/// Text and tag filters for the roadmap view. Empty strings mean unset.
///
/// Tags compare case-insensitively and ignore surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub sub_product: Option<String>,
}

impl RoadmapFilter {
    pub fn new(
        search: Option<String>,
        product: Option<String>,
        sub_product: Option<String>,
    ) -> Self {
        Self {
            search,
            product,
            sub_product,
        }
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
    }

    fn product_tag(&self) -> Option<String> {
        normalize_tag(self.product.as_deref())
    }

    fn sub_product_tag(&self) -> Option<String> {
        normalize_tag(self.sub_product.as_deref())
    }

    fn shows_all_sub_products(&self) -> bool {
        self.product_tag().as_deref() == Some(GENERAL_VIEW_PRODUCT)
            && self.sub_product_tag().as_deref() == Some(GENERAL_SUB_PRODUCT)
    }

    /// Whether `item` passes the text, product and sub-product stages.
    pub fn matches(&self, item: &RoadmapItem) -> bool {
        self.matches_text(item) && self.matches_product(item) && self.matches_sub_product(item)
    }

    fn matches_text(&self, item: &RoadmapItem) -> bool {
        let Some(term) = self.search_term() else {
            return true;
        };
        let contains = |field: Option<&str>| {
            field
                .map(|f| f.to_lowercase().contains(&term))
                .unwrap_or(false)
        };
        contains(Some(item.name.as_str()))
            || contains(item.metric.as_deref()) || contains(item.thesis.as_deref())
    }

    fn matches_product(&self, item: &RoadmapItem) -> bool {
        match self.product_tag() {
            Some(product) => normalize_tag(item.product.as_deref()) == Some(product),
            None => true,
        }
    }

    fn matches_sub_product(&self, item: &RoadmapItem) -> bool {
        match self.sub_product_tag() {
            None => true,
            Some(_) if self.shows_all_sub_products() => true,
            Some(sub) => normalize_tag(item.sub_product.as_deref()) == Some(sub),
        }
    }
}

/// Display order: status priority, then start date with undated items last.
pub fn compare_items(a: &RoadmapItem, b: &RoadmapItem) -> Ordering {
    a.status
        .priority()
        .cmp(&b.status.priority())
        .then_with(|| sort_date(a).cmp(&sort_date(b)))
}

fn sort_date(item: &RoadmapItem) -> NaiveDate {
    item.start_date.unwrap_or(NaiveDate::MAX)
}

/// Items shown on the roadmap for `quarter` of `year`, in display order.
pub fn visible_sorted_items<'a>(
    items: &'a [RoadmapItem],
    quarter: Quarter,
    year: i32,
    filter: &RoadmapFilter,
) -> Vec<&'a RoadmapItem> {
    let mut visible: Vec<&RoadmapItem> = items
        .iter()
        .filter(|item| filter.matches(item))
        .filter(|item| is_visible_in_quarter(item, quarter, year))
        .collect();

    // sort_by is stable: equal keys keep their input order
    visible.sort_by(|a, b| compare_items(a, b));
    visible
}
