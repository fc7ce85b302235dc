//! Deduplication ledger of item identifiers already surfaced
//!
//! Grows for the lifetime of the process with no eviction, which bounds it
//! only by memory. That is fine for catalogs of bounded size; long-lived
//! services tracking unbounded catalogs should cap it.

use crate::item::ItemId;
use ahash::AHashSet;

#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    ids: AHashSet<ItemId>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    /// Record `id` as seen
    ///
    /// Returns `true` if the id was not present before.
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.ids.insert(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_reports_novelty() {
        let mut seen = SeenSet::new();
        assert!(seen.insert(1));
        assert!(!seen.insert(1));
        assert!(seen.contains(1));
        assert!(!seen.contains(2));
        assert_eq!(seen.len(), 1);
    }
}
