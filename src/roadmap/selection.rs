//! Bulk selection over the visible roadmap.
//!
//! Only the set of selected ids is stored. Whether "select all" is checked
//! is derived on demand by comparing that set with the ids currently visible,
//! so narrowing a filter never leaves stale per-row flags behind.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Derived state of the "select all" checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    NoneSelected,
    PartiallySelected,
    AllSelected,
}

/// Ids marked for a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    selected: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// State relative to `visible_ids`.
    ///
    /// `AllSelected` requires the selection to equal the visible set exactly;
    /// selected ids that are no longer visible make it partial.
    pub fn state<I, S>(&self, visible_ids: I) -> SelectionState
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.selected.is_empty() {
            return SelectionState::NoneSelected;
        }
        let visible: BTreeSet<String> = visible_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();

        if visible == self.selected {
            SelectionState::AllSelected
        } else {
            SelectionState::PartiallySelected
        }
    }

    /// Checkbox in the table header: clears when everything visible is
    /// selected, otherwise replaces the selection with `visible_ids`.
    pub fn toggle_all<I, S>(&mut self, visible_ids: I)
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<str>,
    {
        if self.state(visible_ids.clone()) == SelectionState::AllSelected {
            self.selected.clear();
        } else {
            self.selected = visible_ids
                .into_iter()
                .map(|id| id.as_ref().to_string())
                .collect();
        }
    }

    /// Add or remove a single id.
    pub fn toggle(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Freeze the current selection for a bulk delete.
    pub fn snapshot(&self) -> BulkDelete {
        BulkDelete {
            ids: self.selected.iter().cloned().collect(),
        }
    }
}

/// An owned set of ids to delete, detached from the live selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDelete {
    ids: Vec<String>,
}

impl BulkDelete {
    pub fn new(ids: Vec<String>) -> Self {
        let ids: BTreeSet<String> = ids.into_iter().collect();
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
