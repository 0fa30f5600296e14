//! Virtualizer - which items to materialize, and where
//!
//! Converts `(scroll_offset, viewport_size, item_count)` into the smallest set
//! of items to render, each with gap-free positions from an [`OffsetTable`].
//!
//! # Item source
//! The virtualizer does not own items. It keeps one row per item (id and
//! content hash, with the size in the offset table) and is told about changes through
//! [`append`](Virtualizer::append), [`update`](Virtualizer::update) and
//! [`sync`](Virtualizer::sync). Measurements come back through
//! [`measure`](Virtualizer::measure).
//!
//! # Anchor-preserving relayout
//! Every mutation is committed with a single relayout. Before relayout the
//! item containing the scroll offset (the anchor) and the distance into it are
//! recorded; afterwards the scroll offset is moved so the anchor's top sits at
//! the same distance above the viewport top. Size changes above the viewport
//! therefore never move visible content.

use super::offset_table::OffsetTable;
use super::scroll::ScrollAlign;
use super::types::{IndexRange, VirtualItem};
use crate::height_cache::{is_valid_height, ContentHash, HeightCache};
use crate::model::{ItemId, ListItem, Measurement};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Virtualizer settings (the `[virtualizer]` config section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualizerConfig {
    /// Items rendered above the visible range.
    pub overscan_before: usize,
    /// Items rendered below the visible range.
    pub overscan_after: usize,
    /// Window size while the viewport size is unknown (at least 1).
    pub initial_item_count: usize,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            overscan_before: 5,
            overscan_after: 10,
            initial_item_count: 10,
        }
    }
}

/// Materialized slice of the list for one `(offset, viewport)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Items to render, in index order, gap-free.
    pub items: Vec<VirtualItem>,
    /// Strictly visible indices.
    pub visible: Option<IndexRange>,
    /// Rendered indices (visible plus overscan).
    pub rendered: Option<IndexRange>,
    /// End of the last item; size of the scroll content.
    pub total_size: f64,
    /// Offset the window was computed for.
    pub scroll_offset: f64,
    /// Viewport size the window was computed for.
    pub viewport_size: f64,
}

impl Window {
    fn empty(scroll_offset: f64, viewport_size: f64) -> Self {
        Self {
            items: Vec::new(),
            visible: None,
            rendered: None,
            total_size: 0.0,
            scroll_offset,
            viewport_size,
        }
    }

    /// Whether the window has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of a committed mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutChange {
    /// First index whose id or content changed (measurements excluded).
    pub changed_from: Option<usize>,
    /// Index relayout started at, `None` if no size or count changed.
    pub relayout_from: Option<usize>,
    /// Total size before the change.
    pub previous_total: f64,
    /// Total size after the change.
    pub total_size: f64,
    /// Scroll offset before the change.
    pub previous_offset: f64,
    /// Scroll offset after anchor preservation.
    pub scroll_offset: f64,
    /// Measurements applied (0 for non-measurement changes).
    pub applied: usize,
    /// Measurements dropped as unknown, stale or invalid.
    pub rejected: usize,
}

impl LayoutChange {
    /// Whether anchor preservation moved the scroll offset.
    pub fn offset_changed(&self) -> bool {
        self.scroll_offset != self.previous_offset
    }

    /// Whether layout is unchanged.
    pub fn is_noop(&self) -> bool {
        self.relayout_from.is_none()
    }
}

#[derive(Debug, Clone)]
struct Row {
    id: ItemId,
    hash: ContentHash,
}

/// Item index → position mapping with windowing.
#[derive(Debug)]
pub struct Virtualizer {
    rows: Vec<Row>,
    index_of: FxHashMap<ItemId, usize>,
    table: OffsetTable,
    cache: HeightCache,
    config: VirtualizerConfig,
    scroll_offset: f64,
    viewport_size: f64,
}

/// Scroll position recorded before a relayout.
///
/// Resolved by id first, so the anchored item is found again after rows
/// shift (front trims); by index if the item is gone.
#[derive(Debug, Clone)]
struct Anchor {
    index: usize,
    id: ItemId,
    within: f64,
}

/// Why a measurement was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Unknown,
    Stale,
    InvalidHeight,
}

/// Layout state recorded before a mutation.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    len: usize,
    total: f64,
    offset: f64,
}

impl Virtualizer {
    /// Create an empty virtualizer sizing items through `cache`.
    pub fn new(cache: HeightCache, config: VirtualizerConfig) -> Self {
        Self {
            rows: Vec::new(),
            index_of: FxHashMap::default(),
            table: OffsetTable::new(),
            cache,
            config,
            scroll_offset: 0.0,
            viewport_size: 0.0,
        }
    }

    // === Accessors ===

    /// Number of items.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Configuration.
    pub fn config(&self) -> &VirtualizerConfig {
        &self.config
    }

    /// The height cache sizing this list.
    pub fn cache(&self) -> &HeightCache {
        &self.cache
    }

    /// Mutable access to the height cache.
    ///
    /// Sizes already laid out are not affected until the items are
    /// re-synced or measured.
    pub fn cache_mut(&mut self) -> &mut HeightCache {
        &mut self.cache
    }

    /// Swap in a different height cache, returning the old one.
    ///
    /// Like [`cache_mut`](Self::cache_mut), existing sizes stay until the
    /// items are reset.
    pub fn replace_cache(&mut self, cache: HeightCache) -> HeightCache {
        std::mem::replace(&mut self.cache, cache)
    }

    /// Current scroll offset.
    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    /// Current viewport size (0 while unknown).
    pub fn viewport_size(&self) -> f64 {
        self.viewport_size
    }

    /// End of the last item.
    pub fn total_size(&self) -> f64 {
        self.table.total()
    }

    /// Largest valid scroll offset.
    pub fn max_scroll_offset(&self) -> f64 {
        (self.table.total() - self.viewport_size).max(0.0)
    }

    /// Number of relayouts performed so far.
    pub fn relayout_count(&self) -> u64 {
        self.table.relayout_count()
    }

    /// Index of the item with `id`.
    pub fn index_of(&self, id: &ItemId) -> Option<usize> {
        self.index_of.get(id).copied()
    }

    /// Id of the item at `index`.
    pub fn id_at(&self, index: usize) -> Option<&ItemId> {
        self.rows.get(index).map(|row| &row.id)
    }

    fn clamp_offset(&self, offset: f64) -> f64 {
        if offset.is_nan() {
            return 0.0;
        }
        offset.clamp(0.0, self.max_scroll_offset())
    }

    fn clamp_index(&self, index: usize) -> Option<usize> {
        (!self.rows.is_empty()).then(|| index.min(self.rows.len() - 1))
    }

    // === Viewport ===

    /// Set the viewport size. Non-finite or negative sizes count as unknown.
    pub fn set_viewport_size(&mut self, size: f64) {
        self.viewport_size = if size.is_finite() && size > 0.0 { size } else { 0.0 };
        self.scroll_offset = self.clamp_offset(self.scroll_offset);
    }

    /// Set the scroll offset, clamped to `[0, max_scroll_offset]`.
    ///
    /// Returns the offset actually stored.
    pub fn set_scroll_offset(&mut self, offset: f64) -> f64 {
        self.scroll_offset = self.clamp_offset(offset);
        self.scroll_offset
    }

    // === Item source ===

    fn row_for(&mut self, item: &impl ListItem) -> (Row, f64) {
        let hash = ContentHash::of(item.content());
        let size = self.cache.get_hashed(item, hash);
        let row = Row {
            id: item.id().clone(),
            hash,
        };
        (row, size)
    }

    fn index_row(&mut self, index: usize) {
        let id = self.rows[index].id.clone();
        if let Some(previous) = self.index_of.insert(id, index) {
            let duplicate = previous != index
                && self
                    .rows
                    .get(previous)
                    .is_some_and(|row| row.id == self.rows[index].id);
            if duplicate {
                warn!(id = %self.rows[index].id, previous, index, "Duplicate item id");
            }
        }
    }

    /// Append items to the end of the list.
    pub fn append<T: ListItem>(&mut self, items: &[T]) -> LayoutChange {
        let anchor = self.anchor();
        let before = self.snapshot();
        for item in items {
            let (row, size) = self.row_for(item);
            self.rows.push(row);
            self.table.push(size);
            self.index_row(self.rows.len() - 1);
        }
        let changed_from = (!items.is_empty()).then_some(before.len);
        self.commit(anchor, before, changed_from, 0, 0)
    }

    /// Replace the item at `index` (clamped). Used for streaming content.
    pub fn update(&mut self, index: usize, item: &impl ListItem) -> LayoutChange {
        let anchor = self.anchor();
        let before = self.snapshot();
        let index = self.clamp_index(index);
        if let Some(index) = index {
            self.replace_row(index, item);
        }
        self.commit(anchor, before, index, 0, 0)
    }

    fn replace_row(&mut self, index: usize, item: &impl ListItem) {
        let (row, size) = self.row_for(item);
        let old_id = std::mem::replace(&mut self.rows[index].id, row.id);
        self.rows[index].hash = row.hash;
        if old_id != self.rows[index].id && self.index_of.get(&old_id) == Some(&index) {
            self.index_of.remove(&old_id);
        }
        self.index_row(index);
        self.table.set(index, size);
    }

    /// Reconcile with the full item sequence.
    ///
    /// Rows are recomputed only from the first index whose id or content
    /// differs; growth and shrinkage are both handled. Finding that index
    /// compares ids first but still hashes the content of every unchanged
    /// leading item, so a call is O(n) in the list length. Prefer
    /// [`append`](Self::append) or [`update`](Self::update) on hot paths.
    pub fn sync<T: ListItem>(&mut self, items: &[T]) -> LayoutChange {
        let anchor = self.anchor();
        let before = self.snapshot();

        let first_diff = self
            .rows
            .iter()
            .zip(items)
            .position(|(row, item)| &row.id != item.id() || row.hash != ContentHash::of(item.content()))
            .unwrap_or_else(|| self.rows.len().min(items.len()));

        for (index, row) in self.rows.iter().enumerate().skip(first_diff) {
            if self.index_of.get(&row.id) == Some(&index) {
                self.index_of.remove(&row.id);
            }
        }
        self.rows.truncate(items.len());
        self.table.truncate(items.len());

        for (index, item) in items.iter().enumerate().skip(first_diff) {
            let (row, size) = self.row_for(item);
            if index < self.rows.len() {
                self.rows[index] = row;
                self.table.set(index, size);
            } else {
                self.rows.push(row);
                self.table.push(size);
            }
            self.index_row(index);
        }

        debug!(first_diff, len = items.len(), "Synced item rows");
        let changed = first_diff < items.len() || items.len() < before.len;
        self.commit(anchor, before, changed.then_some(first_diff), 0, 0)
    }

    /// Rebuild every row from `items`, re-reading all sizes from the cache.
    ///
    /// Used after the estimate parameters change. The anchor item keeps its
    /// position relative to the viewport top.
    pub fn reset<T: ListItem>(&mut self, items: &[T]) -> LayoutChange {
        let anchor = self.anchor();
        let before = self.snapshot();
        self.rows.clear();
        self.index_of.clear();
        self.table.clear();
        for item in items {
            let (row, size) = self.row_for(item);
            self.rows.push(row);
            self.table.push(size);
            self.index_row(self.rows.len() - 1);
        }
        let changed_from = (!items.is_empty()).then_some(0);
        self.commit(anchor, before, changed_from, 0, 0)
    }

    // === Measurement ===

    /// Apply a batch of real heights with one cache write and one relayout.
    ///
    /// Measurements for unknown ids, or whose content no longer matches the
    /// item's current content, are dropped.
    pub fn measure(&mut self, batch: &[Measurement]) -> LayoutChange {
        let anchor = self.anchor();
        let before = self.snapshot();

        let mut accepted: Vec<(usize, &Measurement)> = Vec::with_capacity(batch.len());
        for m in batch {
            match self.check_measurement(m) {
                Ok(index) => accepted.push((index, m)),
                Err(Rejection::Unknown) => {
                    debug!(id = %m.id, "Dropping measurement for unknown item");
                }
                Err(Rejection::Stale) => debug!(id = %m.id, "Dropping stale measurement"),
                Err(Rejection::InvalidHeight) => {
                    warn!(id = %m.id, height = m.height, "Dropping invalid height measurement");
                }
            }
        }

        self.cache.batch_set(accepted.iter().map(|(_, m)| *m));

        let mut applied = 0;
        for (index, m) in &accepted {
            let hash = self.rows[*index].hash;
            let measured = self
                .cache
                .peek(&m.id)
                .filter(|entry| entry.matches(hash))
                .map(|entry| entry.height);
            if let Some(height) = measured {
                self.table.set(*index, height);
                applied += 1;
            }
        }

        let rejected = batch.len() - applied;
        self.commit(anchor, before, None, applied, rejected)
    }

    /// Whether `measure` would store `m`: a known id, content matching the
    /// item's current content, and a finite positive height.
    pub fn accepts(&self, m: &Measurement) -> bool {
        self.check_measurement(m).is_ok()
    }

    fn check_measurement(&self, m: &Measurement) -> Result<usize, Rejection> {
        let index = self.index_of(&m.id).ok_or(Rejection::Unknown)?;
        if self.rows[index].hash != ContentHash::of(&m.content) {
            return Err(Rejection::Stale);
        }
        if !is_valid_height(m.height) {
            return Err(Rejection::InvalidHeight);
        }
        Ok(index)
    }

    // === Relayout ===

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            len: self.rows.len(),
            total: self.table.total(),
            offset: self.scroll_offset,
        }
    }

    fn anchor(&self) -> Option<Anchor> {
        let index = self.table.index_at(self.scroll_offset)?;
        let start = self.table.start(index)?;
        Some(Anchor {
            index,
            id: self.rows.get(index)?.id.clone(),
            within: self.scroll_offset - start,
        })
    }

    fn commit(
        &mut self,
        anchor: Option<Anchor>,
        before: Snapshot,
        changed_from: Option<usize>,
        applied: usize,
        rejected: usize,
    ) -> LayoutChange {
        let relayout_from = self.table.relayout();

        if relayout_from.is_some() {
            let target = anchor
                .and_then(|a| {
                    let index = self
                        .index_of(&a.id)
                        .or_else(|| self.clamp_index(a.index))?;
                    self.table.start(index).map(|start| start + a.within)
                })
                .unwrap_or(self.scroll_offset);
            self.scroll_offset = self.clamp_offset(target);
            debug!(
                from = ?relayout_from,
                total = self.table.total(),
                offset = self.scroll_offset,
                "Relayout"
            );
        }

        LayoutChange {
            changed_from,
            relayout_from,
            previous_total: before.total,
            total_size: self.table.total(),
            previous_offset: before.offset,
            scroll_offset: self.scroll_offset,
            applied,
            rejected,
        }
    }

    // === Windowing ===

    /// Strictly visible indices for `offset` and `viewport`.
    ///
    /// With an unknown viewport (0), the first `initial_item_count` items from
    /// `offset` are reported.
    pub fn visible_range_at(&self, offset: f64, viewport: f64) -> Option<IndexRange> {
        let last = self.rows.len().checked_sub(1)?;
        let offset = if offset.is_nan() { 0.0 } else { offset.max(0.0) };
        let lo = self.table.index_at(offset).unwrap_or(last);

        if !(viewport.is_finite() && viewport > 0.0) {
            let count = self.config.initial_item_count.max(1);
            return Some(IndexRange::new(lo, lo.saturating_add(count - 1).min(last)));
        }

        let bottom = offset + viewport;
        let mut hi = lo;
        while hi < last && self.table.start(hi + 1).is_some_and(|start| start < bottom) {
            hi += 1;
        }
        Some(IndexRange::new(lo, hi))
    }

    /// Rendered indices (visible plus overscan) for `offset` and `viewport`.
    ///
    /// Overscan is not applied while the viewport is unknown.
    pub fn rendered_range_at(&self, offset: f64, viewport: f64) -> Option<IndexRange> {
        let visible = self.visible_range_at(offset, viewport)?;
        if !(viewport.is_finite() && viewport > 0.0) {
            return Some(visible);
        }
        Some(visible.expand(
            self.config.overscan_before,
            self.config.overscan_after,
            self.rows.len() - 1,
        ))
    }

    /// Window for the current scroll offset and viewport.
    pub fn window(&self) -> Window {
        self.window_at(self.scroll_offset, self.viewport_size)
    }

    /// Window for an arbitrary offset and viewport, without changing state.
    pub fn window_at(&self, offset: f64, viewport: f64) -> Window {
        let (Some(visible), Some(rendered)) = (
            self.visible_range_at(offset, viewport),
            self.rendered_range_at(offset, viewport),
        ) else {
            return Window::empty(offset, viewport);
        };

        let items = rendered
            .indices()
            .filter_map(|index| self.virtual_item(index))
            .collect();
        trace!(?visible, ?rendered, "Computed window");

        Window {
            items,
            visible: Some(visible),
            rendered: Some(rendered),
            total_size: self.table.total(),
            scroll_offset: offset,
            viewport_size: viewport,
        }
    }

    fn virtual_item(&self, index: usize) -> Option<VirtualItem> {
        Some(VirtualItem {
            index,
            id: self.rows.get(index)?.id.clone(),
            start: self.table.start(index)?,
            end: self.table.end(index)?,
            size: self.table.size(index)?,
        })
    }

    /// Layout of the item at `index` (clamped), `None` for an empty list.
    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        self.virtual_item(self.clamp_index(index)?)
    }

    /// Index of the item containing `offset` (clamped to the list).
    pub fn index_at_offset(&self, offset: f64) -> Option<usize> {
        let last = self.rows.len().checked_sub(1)?;
        Some(self.table.index_at(offset).unwrap_or(last))
    }

    /// Offset that brings item `index` (clamped) into view with `align`,
    /// given the viewport currently starts at `current`.
    ///
    /// The result is clamped to `[0, max_scroll_offset]`. `Auto` returns
    /// `current` unchanged when the item is already fully visible.
    pub fn offset_for_index(&self, index: usize, align: ScrollAlign, current: f64) -> Option<f64> {
        let item = self.item(index)?;
        let viewport = self.viewport_size;

        let target = match align {
            ScrollAlign::Start => item.start,
            ScrollAlign::End => item.end - viewport,
            ScrollAlign::Center => item.start + item.size / 2.0 - viewport / 2.0,
            ScrollAlign::Auto => {
                if item.start >= current && item.end <= current + viewport {
                    return Some(current);
                } else if item.start < current {
                    item.start
                } else {
                    item.end - viewport
                }
            }
        };
        Some(self.clamp_offset(target))
    }
}

#[cfg(test)]
#[path = "virtualizer_tests.rs"]
mod tests;
