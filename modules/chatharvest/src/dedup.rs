use std::collections::HashSet;

use chatharvest_common::Identified;

/// Insertion-ordered set of records keyed by their identity.
///
/// The first observation of an identity wins; re-adding a record with a key
/// already present is a no-op, so re-renders of the same row (avatar swap,
/// read-state change) never produce duplicates or reorder the output.
#[derive(Debug, Clone)]
pub struct IdentitySet<T: Identified> {
    keys: HashSet<T::Key>,
    items: Vec<T>,
}

impl<T: Identified> Default for IdentitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified> IdentitySet<T> {
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// Insert if the identity is new. Returns whether it was.
    pub fn add(&mut self, item: T) -> bool {
        if self.keys.insert(item.identity()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    /// Insert every item with a new identity. Returns how many were new.
    pub fn add_all<I: IntoIterator<Item = T>>(&mut self, items: I) -> usize {
        let mut added = 0;
        for item in items {
            if self.add(item) {
                added += 1;
            }
        }
        added
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Records in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Identified> Extend<T> for IdentitySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl<T: Identified> FromIterator<T> for IdentitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.add_all(iter);
        set
    }
}

impl<T: Identified> IntoIterator for IdentitySet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
