//! The item-height cache.
//!
//! Answers "what height should item X render at": a measured height while
//! the item's content is unchanged, an estimate otherwise.
//!
//! # Staleness
//! Every entry carries the hash of the content that was measured. A lookup
//! whose current content hashes differently deletes the entry and counts as
//! a miss, so a height is never served for content it was not measured on.
//!
//! # Eviction
//! Entries live in an LRU ordered by *write* time. Reads use `peek` and never
//! promote, so iteration order is most-recently-written first, which is also
//! the snapshot order.
//!
//! # Persistence
//! Optional and off the hot path: snapshots are written every
//! `flush_every` accepted writes, once per `batch_set`, or on `flush()`.
//! Store failures are logged once and the cache continues in memory only.

use super::entry::{is_valid_height, CacheEntry, ContentHash};
use super::estimate::EstimateConfig;
use super::store::SnapshotStore;
use crate::model::{ItemId, ListItem, Measurement, StoreError};
use chrono::Utc;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Configuration for the height cache (the `[cache]` config section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeightCacheConfig {
    /// Maximum in-memory entries (0 = unbounded).
    pub capacity: usize,
    /// Store key the snapshot is written under.
    pub snapshot_key: String,
    /// Maximum records written to a snapshot (most recent first).
    pub snapshot_max_entries: usize,
    /// Records older than this are dropped when a snapshot is loaded.
    pub ttl_secs: u64,
    /// Accepted `set` calls between automatic flushes (0 = explicit flush only).
    pub flush_every: usize,
}

impl Default for HeightCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 5000,
            snapshot_key: "streamlist-heights-v1".to_string(),
            snapshot_max_entries: 1000,
            ttl_secs: 7 * 24 * 60 * 60,
            flush_every: 10,
        }
    }
}

impl HeightCacheConfig {
    /// Snapshot time-to-live.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Cache counters for observability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Entries currently cached.
    pub size: usize,
    /// Lookups served from a matching entry.
    pub hits: u64,
    /// Lookups that fell back to estimation.
    pub misses: u64,
    /// Mean cached height (`default_height` when empty).
    pub avg_height: f64,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Persistence {
    store: Box<dyn SnapshotStore>,
    writes_since_flush: usize,
    /// Set after the first store failure; no further store calls are made.
    degraded: bool,
}

impl Persistence {
    fn fail(&mut self, op: &str, err: &StoreError) {
        if !self.degraded {
            warn!(op, error = %err, "Height snapshot store failed, continuing in memory only");
        }
        self.degraded = true;
    }
}

/// Per-item height records with estimation fallback.
pub struct HeightCache {
    entries: LruCache<ItemId, CacheEntry>,
    estimate: EstimateConfig,
    config: HeightCacheConfig,
    persistence: Option<Persistence>,
    hits: u64,
    misses: u64,
}

impl std::fmt::Debug for HeightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeightCache")
            .field("len", &self.entries.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .field("persistent", &self.persistence.is_some())
            .finish()
    }
}

impl HeightCache {
    /// Create an in-memory cache.
    pub fn new(estimate: EstimateConfig, config: HeightCacheConfig) -> Self {
        let entries = match NonZeroUsize::new(config.capacity) {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            estimate: estimate.sanitized(),
            config,
            persistence: None,
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache backed by `store`, loading its current snapshot.
    ///
    /// Expired and invalid records are dropped. A malformed snapshot yields an
    /// empty cache (and is overwritten by the next flush). An unreadable store
    /// yields an empty, in-memory-only cache.
    pub fn with_store(
        estimate: EstimateConfig,
        config: HeightCacheConfig,
        store: Box<dyn SnapshotStore>,
    ) -> Self {
        let mut cache = Self::new(estimate, config);
        let mut persistence = Persistence {
            store,
            writes_since_flush: 0,
            degraded: false,
        };

        match persistence.store.get(&cache.config.snapshot_key) {
            Ok(Some(value)) => cache.restore(value),
            Ok(None) => debug!("No height snapshot found"),
            Err(StoreError::Json(err)) => {
                warn!(error = %err, "Height snapshot is corrupted, starting empty");
            }
            Err(err) => persistence.fail("load", &err),
        }

        cache.persistence = Some(persistence);
        cache
    }

    fn restore(&mut self, value: Value) {
        let Value::Array(records) = value else {
            warn!("Height snapshot is not an array, starting empty");
            return;
        };

        let now = Utc::now();
        let ttl = self.config.ttl();
        let total = records.len();
        let mut loaded: Vec<CacheEntry> = records
            .into_iter()
            .filter_map(|record| serde_json::from_value::<CacheEntry>(record).ok())
            .filter(|entry| is_valid_height(entry.height) && !entry.is_expired(now, ttl))
            .collect();

        // Oldest first so the newest ends up most recently written.
        loaded.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let kept = loaded.len();
        for mut entry in loaded {
            entry.height = self.estimate.clamp_height(entry.height);
            self.entries.put(entry.id.clone(), entry);
        }
        debug!(total, kept, "Restored height snapshot");
    }

    // === Configuration ===

    /// Current estimation parameters.
    pub fn estimate_config(&self) -> &EstimateConfig {
        &self.estimate
    }

    /// Replace the estimation parameters.
    ///
    /// Cached heights are re-clamped into the new bounds.
    pub fn set_estimate_config(&mut self, estimate: EstimateConfig) {
        self.estimate = estimate.sanitized();
        for (_, entry) in self.entries.iter_mut() {
            entry.height = self.estimate.clamp_height(entry.height);
        }
    }

    /// Cache configuration.
    pub fn config(&self) -> &HeightCacheConfig {
        &self.config
    }

    // === Lookup ===

    /// Estimate `item`'s height without consulting the cache.
    pub fn estimate(&self, item: &impl ListItem) -> f64 {
        self.estimate.estimate_item(item)
    }

    /// Height `item` should render at: cached if the content is unchanged,
    /// estimated otherwise. Counts a hit or a miss.
    pub fn get(&mut self, item: &impl ListItem) -> f64 {
        let hash = ContentHash::of(item.content());
        self.get_hashed(item, hash)
    }

    /// [`get`](Self::get) with a precomputed content hash.
    pub fn get_hashed(&mut self, item: &impl ListItem, hash: ContentHash) -> f64 {
        match self.lookup(item.id(), hash) {
            Some(height) => height,
            None => self.estimate(item),
        }
    }

    /// Cached height for `id` if its entry matches `hash`.
    ///
    /// A mismatching entry is deleted before the miss is reported.
    pub fn lookup(&mut self, id: &ItemId, hash: ContentHash) -> Option<f64> {
        let cached = self
            .entries
            .peek(id)
            .map(|entry| (entry.height, entry.matches(hash)));

        match cached {
            Some((height, true)) => {
                self.hits += 1;
                trace!(id = %id, height, "Height cache hit");
                Some(height)
            }
            Some((_, false)) => {
                self.entries.pop(id);
                self.misses += 1;
                debug!(id = %id, "Dropped stale height entry");
                None
            }
            None => {
                self.misses += 1;
                trace!(id = %id, "Height cache miss");
                None
            }
        }
    }

    /// Entry for `id` without touching counters or staleness.
    pub fn peek(&self, id: &ItemId) -> Option<&CacheEntry> {
        self.entries.peek(id)
    }

    /// Whether an entry exists for `id`, stale or not.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.contains(id)
    }

    // === Writes ===

    /// Record a measured height for `id` rendered from `content`.
    ///
    /// Non-finite, zero and negative heights are logged and ignored. Returns
    /// whether the height was stored.
    pub fn set(&mut self, id: &ItemId, height: f64, content: &str) -> bool {
        if !self.store_entry(id, height, content) {
            return false;
        }

        if let Some(persistence) = self.persistence.as_mut() {
            persistence.writes_since_flush += 1;
            let due = self.config.flush_every > 0
                && persistence.writes_since_flush >= self.config.flush_every;
            if due {
                self.flush();
            }
        }
        true
    }

    /// Apply `set` to every measurement, then flush once.
    ///
    /// Returns the number of measurements stored.
    pub fn batch_set<'a>(&mut self, measurements: impl IntoIterator<Item = &'a Measurement>) -> usize {
        let mut stored = 0;
        for m in measurements {
            if self.store_entry(&m.id, m.height, &m.content) {
                stored += 1;
            }
        }
        if stored > 0 {
            self.flush();
        }
        stored
    }

    fn store_entry(&mut self, id: &ItemId, height: f64, content: &str) -> bool {
        if !is_valid_height(height) {
            warn!(id = %id, height, "Ignoring invalid height measurement");
            return false;
        }

        let height = self.estimate.clamp_height(height);
        let entry = CacheEntry::new(id.clone(), height, ContentHash::of(content), Utc::now());
        self.entries.put(id.clone(), entry);
        true
    }

    /// Remove every entry and the persisted snapshot.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        if let Some(persistence) = self.persistence.as_mut() {
            persistence.writes_since_flush = 0;
            if !persistence.degraded {
                if let Err(err) = persistence.store.remove(&self.config.snapshot_key) {
                    persistence.fail("remove", &err);
                }
            }
        }
        debug!("Cleared height cache");
    }

    /// Remove the entry for `id`, if any.
    pub fn clear_one(&mut self, id: &ItemId) {
        self.entries.pop(id);
    }

    /// Write the snapshot now: at most `snapshot_max_entries` records, most
    /// recent first. No-op without a store or after a store failure.
    pub fn flush(&mut self) {
        let Some(persistence) = self.persistence.as_mut() else {
            return;
        };
        persistence.writes_since_flush = 0;
        if persistence.degraded {
            return;
        }

        let snapshot: Vec<&CacheEntry> = self
            .entries
            .iter()
            .map(|(_, entry)| entry)
            .take(self.config.snapshot_max_entries)
            .collect();
        let count = snapshot.len();

        let result = serde_json::to_value(&snapshot)
            .map_err(StoreError::from)
            .and_then(|value| persistence.store.set(&self.config.snapshot_key, &value));
        match result {
            Ok(()) => debug!(count, "Flushed height snapshot"),
            Err(err) => persistence.fail("flush", &err),
        }
    }

    /// Whether persistence has been disabled by a store failure.
    pub fn is_degraded(&self) -> bool {
        self.persistence.as_ref().is_some_and(|p| p.degraded)
    }

    // === Observability ===

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mean of all cached heights, or `default_height` if empty.
    pub fn average_height(&self) -> f64 {
        if self.entries.is_empty() {
            return self.estimate.default_height;
        }
        let sum: f64 = self.entries.iter().map(|(_, entry)| entry.height).sum();
        sum / self.entries.len() as f64
    }

    /// Size, hit/miss counters and average height.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            avg_height: self.average_height(),
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
