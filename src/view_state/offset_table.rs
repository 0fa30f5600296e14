//! OffsetTable - cumulative item offsets with incremental relayout
//!
//! Stores each item's size and the offset of its top edge:
//! `start[i] = start[i - 1] + size[i - 1]`. Size changes only mark the table
//! dirty from the lowest changed index; [`OffsetTable::relayout`] then
//! recomputes starts from that index forward in one pass.
//!
//! # Complexity
//!
//! - `push` / `set`: O(1) (marks dirty)
//! - `relayout`: O(n - dirty_from)
//! - `index_at`: O(log n)
//! - `start` / `end` / `size` / `total`: O(1)
//!
//! # Exactness
//!
//! The end of item `i` and the start of item `i + 1` are computed by the same
//! floating-point addition, so consecutive items always share an edge exactly.

/// Cumulative offset table over item sizes.
///
/// Queries reflect the last [`relayout`](Self::relayout); callers mutate,
/// then relayout once.
#[derive(Debug, Clone, Default)]
pub struct OffsetTable {
    sizes: Vec<f64>,
    starts: Vec<f64>,
    total: f64,
    /// Lowest index whose start may be out of date.
    dirty_from: Option<usize>,
    relayouts: u64,
}

impl OffsetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Whether the table has no items.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Append an item of `size`.
    pub fn push(&mut self, size: f64) {
        let index = self.sizes.len();
        self.sizes.push(size);
        self.starts.push(0.0);
        self.mark_dirty(index);
    }

    /// Set the size at `index`. Returns true if the size changed.
    ///
    /// Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, size: f64) -> bool {
        match self.sizes.get_mut(index) {
            Some(current) if *current != size => {
                *current = size;
                self.mark_dirty(index);
                true
            }
            _ => false,
        }
    }

    /// Drop every item at or after `len`.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.sizes.len() {
            return;
        }
        self.sizes.truncate(len);
        self.starts.truncate(len);
        self.mark_dirty(len);
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.sizes.clear();
        self.starts.clear();
        self.total = 0.0;
        self.dirty_from = None;
    }

    fn mark_dirty(&mut self, index: usize) {
        self.dirty_from = Some(self.dirty_from.map_or(index, |d| d.min(index)));
    }

    /// Whether a relayout is pending.
    pub fn is_dirty(&self) -> bool {
        self.dirty_from.is_some()
    }

    /// Recompute starts from the lowest dirty index forward.
    ///
    /// Returns the index recomputation began at, or `None` if nothing was
    /// dirty.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamlist::view_state::offset_table::OffsetTable;
    /// let mut table = OffsetTable::new();
    /// table.push(10.0);
    /// table.push(20.0);
    /// table.push(15.0);
    /// assert_eq!(table.relayout(), Some(0));
    /// assert_eq!(table.start(2), Some(30.0));
    ///
    /// table.set(1, 5.0);
    /// assert_eq!(table.relayout(), Some(1));
    /// assert_eq!(table.start(2), Some(15.0));
    /// assert_eq!(table.total(), 30.0);
    /// assert_eq!(table.relayout(), None);
    /// ```
    pub fn relayout(&mut self) -> Option<usize> {
        let from = self.dirty_from.take()?;
        self.relayouts += 1;

        if from >= self.sizes.len() {
            self.total = self.sizes.last().map_or(0.0, |_| self.end_unchecked(self.sizes.len() - 1));
            return Some(from);
        }

        let mut cumulative = if from == 0 {
            0.0
        } else {
            self.end_unchecked(from - 1)
        };
        for (start, size) in self.starts[from..].iter_mut().zip(&self.sizes[from..]) {
            *start = cumulative;
            cumulative = *start + *size;
        }
        self.total = cumulative;
        Some(from)
    }

    fn end_unchecked(&self, index: usize) -> f64 {
        self.starts[index] + self.sizes[index]
    }

    /// Number of relayouts performed.
    pub fn relayout_count(&self) -> u64 {
        self.relayouts
    }

    /// Size of the item at `index`.
    pub fn size(&self, index: usize) -> Option<f64> {
        self.sizes.get(index).copied()
    }

    /// Top edge of the item at `index`.
    pub fn start(&self, index: usize) -> Option<f64> {
        self.starts.get(index).copied()
    }

    /// Bottom edge of the item at `index`.
    pub fn end(&self, index: usize) -> Option<f64> {
        (index < self.sizes.len()).then(|| self.end_unchecked(index))
    }

    /// End of the last item (0 when empty).
    pub fn total(&self) -> f64 {
        self.total
    }

    /// First index whose end lies strictly below `offset`, i.e. the item
    /// containing `offset`.
    ///
    /// Negative offsets map to index 0; offsets at or past [`total`](Self::total)
    /// return `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamlist::view_state::offset_table::OffsetTable;
    /// let mut table = OffsetTable::new();
    /// table.push(10.0); // [0, 10)
    /// table.push(20.0); // [10, 30)
    /// table.relayout();
    ///
    /// assert_eq!(table.index_at(0.0), Some(0));
    /// assert_eq!(table.index_at(9.5), Some(0));
    /// assert_eq!(table.index_at(10.0), Some(1));
    /// assert_eq!(table.index_at(30.0), None);
    /// ```
    pub fn index_at(&self, offset: f64) -> Option<usize> {
        if self.sizes.is_empty() || offset >= self.total {
            return None;
        }
        let after = self.starts.partition_point(|&start| start <= offset);
        Some(after.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(sizes: &[f64]) -> OffsetTable {
        let mut table = OffsetTable::new();
        for &size in sizes {
            table.push(size);
        }
        table.relayout();
        table
    }

    #[test]
    fn empty_table_has_zero_total() {
        let mut table = OffsetTable::new();
        assert_eq!(table.relayout(), None);
        assert_eq!(table.total(), 0.0);
        assert_eq!(table.index_at(0.0), None);
    }

    #[test]
    fn starts_are_cumulative() {
        let table = table(&[10.0, 20.0, 30.0]);
        assert_eq!(table.start(0), Some(0.0));
        assert_eq!(table.start(1), Some(10.0));
        assert_eq!(table.start(2), Some(30.0));
        assert_eq!(table.end(2), Some(60.0));
        assert_eq!(table.total(), 60.0);
    }

    #[test]
    fn relayout_starts_from_lowest_dirty_index() {
        let mut table = table(&[10.0; 10]);
        table.set(7, 20.0);
        table.set(3, 5.0);
        assert_eq!(table.relayout(), Some(3));
        assert_eq!(table.start(4), Some(35.0));
        assert_eq!(table.total(), 105.0);
    }

    #[test]
    fn set_with_same_size_is_not_a_change() {
        let mut table = table(&[10.0, 10.0]);
        assert!(!table.set(1, 10.0));
        assert!(!table.is_dirty());
    }

    #[test]
    fn set_out_of_range_is_ignored() {
        let mut table = table(&[10.0]);
        assert!(!table.set(5, 1.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn truncate_updates_total() {
        let mut table = table(&[10.0, 20.0, 30.0]);
        table.truncate(1);
        table.relayout();
        assert_eq!(table.len(), 1);
        assert_eq!(table.total(), 10.0);

        table.truncate(0);
        table.relayout();
        assert_eq!(table.total(), 0.0);
    }

    #[test]
    fn relayout_count_counts_passes_not_mutations() {
        let mut table = table(&[10.0; 4]);
        let before = table.relayout_count();
        table.set(0, 1.0);
        table.set(1, 2.0);
        table.set(2, 3.0);
        table.relayout();
        assert_eq!(table.relayout_count(), before + 1);
    }

    #[test]
    fn index_at_negative_offset_is_first_item() {
        let table = table(&[10.0, 10.0]);
        assert_eq!(table.index_at(-5.0), Some(0));
    }

    proptest! {
        #[test]
        fn prop_consecutive_items_share_edges(
            sizes in prop::collection::vec(0.5f64..500.0, 1..200),
            updates in prop::collection::vec((0usize..200, 0.5f64..500.0), 0..20),
        ) {
            let mut table = table(&sizes);
            for (index, size) in updates {
                table.set(index % sizes.len(), size);
            }
            table.relayout();

            for i in 0..table.len() - 1 {
                prop_assert_eq!(table.end(i), table.start(i + 1));
            }
            prop_assert_eq!(table.end(table.len() - 1), Some(table.total()));
        }

        #[test]
        fn prop_incremental_matches_full_relayout(
            sizes in prop::collection::vec(0.5f64..500.0, 1..100),
            index in 0usize..100,
            size in 0.5f64..500.0,
        ) {
            let mut incremental = table(&sizes);
            let index = index % sizes.len();
            incremental.set(index, size);
            incremental.relayout();

            let mut updated = sizes.clone();
            updated[index] = size;
            let full = table(&updated);

            for i in 0..sizes.len() {
                prop_assert_eq!(incremental.start(i), full.start(i));
            }
            prop_assert_eq!(incremental.total(), full.total());
        }

        #[test]
        fn prop_index_at_contains_offset(
            sizes in prop::collection::vec(0.5f64..500.0, 1..100),
            fraction in 0.0f64..1.0,
        ) {
            let table = table(&sizes);
            let offset = table.total() * fraction;
            if let Some(i) = table.index_at(offset) {
                let start = table.start(i).unwrap();
                let end = table.end(i).unwrap();
                prop_assert!(start <= offset && offset < end);
            }
        }
    }
}
