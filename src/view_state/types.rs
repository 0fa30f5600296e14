//! Core view-state value types

use crate::model::ItemId;

/// Inclusive range of item indices. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRange {
    /// First index (inclusive).
    pub start: usize,
    /// Last index (inclusive).
    pub end: usize,
}

impl IndexRange {
    /// Create a range, swapping the bounds if they are reversed.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Number of indices covered. Never zero.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: an inclusive range covers at least one index.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `index` lies inside the range.
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }

    /// Iterate the covered indices in order.
    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Grow by `before` below and `after` above, clamped to `[0, last]`.
    pub fn expand(&self, before: usize, after: usize, last: usize) -> Self {
        Self {
            start: self.start.saturating_sub(before),
            end: self.end.saturating_add(after).min(last),
        }
    }
}

/// One item of a rendered window, positioned in the scroll content.
///
/// # Invariants
/// - `end == start + size`
/// - within a window, `items[i].end == items[i + 1].start`
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualItem {
    /// Position in the item sequence.
    pub index: usize,
    /// Stable item id.
    pub id: ItemId,
    /// Offset of the item's top edge.
    pub start: f64,
    /// Offset of the item's bottom edge.
    pub end: f64,
    /// Height used for layout (measured or estimated).
    pub size: f64,
}
