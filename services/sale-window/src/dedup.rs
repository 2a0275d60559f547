//! Seen-identifier index guarding against reprocessing a sale
//!
//! Upstream redelivers sales (reconnects, overlapping batches). Every id
//! currently held by the window is present here and nothing else is; the
//! window store mutates both together.

use std::collections::HashSet;

use sale_types::ids::SaleId;

/// Set of sale ids currently retained by the window.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    seen: HashSet<SaleId>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the id is currently retained.
    pub fn contains(&self, id: &SaleId) -> bool {
        self.seen.contains(id)
    }

    /// Record an id. Returns `false` if it was already present.
    pub fn add(&mut self, id: SaleId) -> bool {
        self.seen.insert(id)
    }

    /// Release an id. Returns `false` if it was not present.
    pub fn remove(&mut self, id: &SaleId) -> bool {
        self.seen.remove(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_contains() {
        let mut index = DedupIndex::new();
        assert!(!index.contains(&SaleId::Numeric(1)));

        assert!(index.add(SaleId::Numeric(1)));
        assert!(index.contains(&SaleId::Numeric(1)));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_add_twice_reports_duplicate() {
        let mut index = DedupIndex::new();
        assert!(index.add(SaleId::from("a")));
        assert!(!index.add(SaleId::from("a")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_remove_releases_id() {
        let mut index = DedupIndex::new();
        index.add(SaleId::Numeric(5));

        assert!(index.remove(&SaleId::Numeric(5)));
        assert!(!index.contains(&SaleId::Numeric(5)));
        assert!(index.is_empty());

        // Removing again is a no-op
        assert!(!index.remove(&SaleId::Numeric(5)));
    }

    #[test]
    fn test_id_shapes_are_distinct() {
        let mut index = DedupIndex::new();
        index.add(SaleId::Numeric(42));
        assert!(!index.contains(&SaleId::from("42")));
    }
}
