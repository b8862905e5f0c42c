//! Row selection for bulk actions.

use serde::{Deserialize, Serialize};

/// Ordered set of selected row ids. Insertion order is the order a bulk
/// action visits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection<T> {
    ids: Vec<T>,
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self { ids: Vec::new() }
    }
}

impl<T: Copy + PartialEq> Selection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the id if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: T) -> bool {
        if let Some(pos) = self.ids.iter().position(|x| *x == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn insert(&mut self, id: T) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    /// Add every id on the current page, keeping existing selections.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = T>) {
        for id in ids {
            self.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    #[must_use]
    pub fn contains(&self, id: T) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> &[T] {
        &self.ids
    }
}

impl<T: Copy + PartialEq + std::fmt::Display> Selection<T> {
    /// Comma-separated ids, the format bulk forms post.
    #[must_use]
    pub fn to_param(&self) -> String {
        self.ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<T: Copy + PartialEq> FromIterator<T> for Selection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut selection = Self::new();
        selection.select_all(iter);
        selection
    }
}
